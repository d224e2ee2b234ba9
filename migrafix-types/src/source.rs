use serde::{Deserialize, Serialize};

/// One fetched file. Immutable for the duration of a run; applying edits
/// produces new content under the same path rather than mutating this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Repo-relative path with `/` separators. Unique within a run.
    pub path: String,
    pub content: String,
    /// Size in bytes as reported by the fetcher.
    pub size: u64,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len() as u64,
            content,
        }
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.path)
    }
}

/// Lowercased extension of a `/`-separated path.
pub fn file_extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Final component of a `/`-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    pub files_seen: u64,
    pub files_included: u64,
    pub excluded_by_pattern: u64,
    pub excluded_oversize: u64,
    pub excluded_unreadable: u64,
    /// Included files that were not UTF-8 and were read as Windows-1252.
    #[serde(default)]
    pub decoded_legacy: u64,
}

/// A file that was fetched but not sent for change generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

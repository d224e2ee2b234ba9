use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name of the manifest inside a backup directory.
pub const BACKUP_MANIFEST_FILE: &str = "backup_manifest.json";

/// Mapping from original repo-relative path to its backup copy.
///
/// Created before any record is applied; entries are only ever added during
/// a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub schema: String,
    pub created_at: DateTime<Utc>,

    /// Repository root the original paths are relative to.
    pub source_root: String,

    /// Directory holding the backup copies and this manifest.
    pub backup_dir: String,

    #[serde(default)]
    pub entries: BTreeMap<String, BackupEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// File name inside `backup_dir`.
    pub backup_path: String,
    pub sha256: String,
    pub bytes: u64,
}

impl BackupManifest {
    pub fn new(source_root: impl Into<String>, backup_dir: impl Into<String>) -> Self {
        Self {
            schema: crate::schema::MIGRAFIX_BACKUP_V1.to_string(),
            created_at: Utc::now(),
            source_root: source_root.into(),
            backup_dir: backup_dir.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

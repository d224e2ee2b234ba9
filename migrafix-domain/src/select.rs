//! Which fetched files are worth a change-generation call.

use migrafix_types::source::{SourceFile, file_name};

const SKIP_SEGMENTS: [&str; 6] = ["/target/", "/build/", "/node_modules/", "/.git/", "/.idea/", "/.gradle/"];

const DOC_NAMES: [&str; 4] = ["readme", "changelog", "license", "notice"];

/// Lowercased path fragments that mark a file as Spring-relevant.
const PRIORITY_MARKERS: [&str; 12] = [
    "pom.xml",
    "build.gradle",
    "application.",
    "config",
    "controller",
    "service",
    "repository",
    "entity",
    "component",
    "security",
    "boot",
    "spring",
];

/// Smallest file cap accepted from configuration or the command line.
pub const MIN_FILE_LIMIT: usize = 10;

pub fn is_priority_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    PRIORITY_MARKERS.iter().any(|m| lower.contains(m))
}

/// Keep at most `max` files: Spring-relevant paths first, then the rest in
/// discovery order. Returns `(kept, dropped)`, both in discovery order.
pub fn limit_files(files: Vec<SourceFile>, max: usize) -> (Vec<SourceFile>, Vec<SourceFile>) {
    if files.len() <= max {
        return (files, Vec::new());
    }
    let mut keep = vec![false; files.len()];
    let mut quota = max;
    for priority in [true, false] {
        for (i, f) in files.iter().enumerate() {
            if quota == 0 {
                break;
            }
            if !keep[i] && is_priority_path(&f.path) == priority {
                keep[i] = true;
                quota -= 1;
            }
        }
    }
    let (kept, dropped): (Vec<_>, Vec<_>) = files.into_iter().zip(keep).partition(|(_, k)| *k);
    (
        kept.into_iter().map(|(f, _)| f).collect(),
        dropped.into_iter().map(|(f, _)| f).collect(),
    )
}

/// Why `file` should not be sent for change generation, if it should not.
pub fn skip_reason(file: &SourceFile, max_analyzable_bytes: u64) -> Option<String> {
    if file.content.contains('\0') {
        return Some("binary content".to_string());
    }
    if file.content.trim().is_empty() {
        return Some("empty file".to_string());
    }
    if file.size > max_analyzable_bytes {
        return Some(format!(
            "too large for change generation ({} > {} bytes)",
            file.size, max_analyzable_bytes
        ));
    }
    let slashed = format!("/{}", file.path);
    if let Some(seg) = SKIP_SEGMENTS.iter().find(|s| slashed.contains(*s)) {
        return Some(format!("generated or tooling path ({})", seg.trim_matches('/')));
    }
    let name = file_name(&file.path).to_ascii_lowercase();
    if name.contains(".min.") {
        return Some("minified file".to_string());
    }
    if DOC_NAMES.iter().any(|d| name.starts_with(d)) {
        return Some("documentation file".to_string());
    }
    None
}

//! Edit engine for migrafix change sets.
//!
//! Responsibilities:
//! - Apply one confirmed record to file content, purely.
//! - Apply all records for one file in a single pass (one write per file).
//! - Snapshot originals before anything is modified, and restore them.
//! - Generate a unified diff preview.

mod apply;
mod backup;
mod error;
mod patch;
mod restore;

pub use apply::apply_change;
pub use backup::{BackupVault, backup_dir_name, backup_name};
pub use error::{ApplyError, BackupError, RestoreError};
pub use patch::render_patch;
pub use restore::{RestoreFailure, RestoreReport, load_manifest, restore};

use migrafix_domain::NamespaceTable;
use migrafix_types::apply::ApplyOutcome;
use migrafix_types::change::ChangeRecord;
use tracing::{debug, warn};

pub const MANUAL_REVIEW_REQUIRED: &str = "manual review required";

/// Result of applying every record for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    pub content: String,
    pub outcomes: Vec<ApplyOutcome>,
}

impl FileEdit {
    pub fn changed(&self, original: &str) -> bool {
        self.content != original
    }
}

/// Apply `records` (all for the same file) sequentially to `original`.
///
/// Each record sees the content produced by the records before it. Records
/// that are not eligible for application are skipped with a reason; a record
/// that fails leaves the content as it was before that record.
pub fn apply_file<'a, I>(original: &str, records: I, namespaces: &NamespaceTable) -> FileEdit
where
    I: IntoIterator<Item = &'a ChangeRecord>,
{
    let mut content = original.to_string();
    let mut outcomes = Vec::new();

    for record in records {
        let id = record.id.clone();
        if !record.is_eligible_for_apply() {
            outcomes.push(ApplyOutcome::skipped(
                id,
                &record.file,
                record.category,
                MANUAL_REVIEW_REQUIRED,
            ));
            continue;
        }
        match apply_change(record, &content, namespaces) {
            Ok(next) => {
                debug!(file = %record.file, change = %record.id.short(), "applied");
                content = next;
                outcomes.push(ApplyOutcome::applied(id, &record.file, record.category));
            }
            Err(e) if e.is_skip() => {
                debug!(file = %record.file, change = %record.id.short(), reason = %e, "skipped");
                outcomes.push(ApplyOutcome::skipped(id, &record.file, record.category, e.to_string()));
            }
            Err(e) => {
                warn!(file = %record.file, change = %record.id.short(), error = %e, "change failed");
                outcomes.push(ApplyOutcome::failed(id, &record.file, record.category, e.to_string()));
            }
        }
    }

    FileEdit { content, outcomes }
}

//! Restore originals from a backup manifest.

use crate::error::RestoreError;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use migrafix_hash::sha256_hex;
use migrafix_types::backup::BackupManifest;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub target_root: String,
    pub dry_run: bool,
    pub restored: Vec<String>,
    pub failed: Vec<RestoreFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreFailure {
    pub path: String,
    pub reason: String,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn load_manifest(path: &Utf8Path) -> Result<BackupManifest, RestoreError> {
    let text = fs::read_to_string(path).map_err(|e| RestoreError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| RestoreError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Copy every backed-up file back to `target_root` (the manifest's source
/// root when `None`).
///
/// Backup copies are located next to the manifest and checked against the
/// recorded checksum first; a mismatching or missing copy is reported and
/// its original left alone.
pub fn restore(
    manifest_path: &Utf8Path,
    target_root: Option<&Utf8Path>,
    dry_run: bool,
) -> Result<RestoreReport, RestoreError> {
    let manifest = load_manifest(manifest_path)?;
    let backup_dir = manifest_path
        .parent()
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let root = target_root
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| Utf8PathBuf::from(&manifest.source_root));

    let mut report = RestoreReport {
        target_root: root.to_string(),
        dry_run,
        ..RestoreReport::default()
    };

    for (rel, entry) in &manifest.entries {
        let src = backup_dir.join(&entry.backup_path);
        let bytes = match fs::read(&src) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %rel, error = %e, "backup copy unreadable");
                report.failed.push(RestoreFailure {
                    path: rel.clone(),
                    reason: format!("read {src}: {e}"),
                });
                continue;
            }
        };
        if sha256_hex(&bytes) != entry.sha256 {
            warn!(path = %rel, "backup checksum mismatch");
            report.failed.push(RestoreFailure {
                path: rel.clone(),
                reason: "checksum mismatch".to_string(),
            });
            continue;
        }
        if !dry_run {
            let dest = root.join(rel);
            let written = dest
                .parent()
                .map_or(Ok(()), |p| fs::create_dir_all(p))
                .and_then(|_| fs::write(&dest, &bytes));
            if let Err(e) = written {
                report.failed.push(RestoreFailure {
                    path: rel.clone(),
                    reason: format!("write {dest}: {e}"),
                });
                continue;
            }
        }
        report.restored.push(rel.clone());
    }

    info!(
        restored = report.restored.len(),
        failed = report.failed.len(),
        dry_run,
        "restore finished"
    );
    Ok(report)
}

//! Fail-closed snapshots of files before they are modified.

use crate::error::BackupError;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fs_err as fs;
use migrafix_hash::sha256_hex;
use migrafix_types::backup::{BACKUP_MANIFEST_FILE, BackupEntry, BackupManifest};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Flat, collision-free file name for a repo-relative path.
///
/// Separators are normalized to `/` first; `%` and `/` are then
/// percent-escaped, so distinct paths always map to distinct names.
pub fn backup_name(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let mut out = String::with_capacity(normalized.len() + 8);
    for c in normalized.trim_start_matches("./").chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    out
}

/// Directory name for one run's backups.
pub fn backup_dir_name(project: &str, at: DateTime<Utc>) -> String {
    format!("{}_backup_{}", backup_name(project), at.format("%Y%m%d_%H%M%S"))
}

/// Backup store for one run.
///
/// Every snapshot reads all requested files before writing anything and
/// persists the manifest after each successful snapshot.
#[derive(Debug)]
pub struct BackupVault {
    repo_root: Utf8PathBuf,
    dir: Utf8PathBuf,
    manifest: BackupManifest,
}

impl BackupVault {
    /// Create the backup directory. Nothing is written until the first
    /// snapshot.
    pub fn create(repo_root: &Utf8Path, dir: &Utf8Path) -> Result<Self, BackupError> {
        fs::create_dir_all(dir).map_err(|source| BackupError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            dir: dir.to_path_buf(),
            manifest: BackupManifest::new(repo_root.as_str(), dir.as_str()),
        })
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    pub fn manifest(&self) -> &BackupManifest {
        &self.manifest
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.dir.join(BACKUP_MANIFEST_FILE)
    }

    /// Back up every path in `paths` that has no entry yet.
    ///
    /// A read failure leaves the vault untouched. A write failure leaves the
    /// manifest without the failed entries, and the error is returned so the
    /// caller can abort before modifying anything.
    pub fn snapshot<'a, I>(&mut self, paths: I) -> Result<&BackupManifest, BackupError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pending: BTreeSet<&str> = paths
            .into_iter()
            .filter(|p| !self.manifest.contains(p))
            .collect();
        if pending.is_empty() {
            debug!(dir = %self.dir, "backup already covers requested files");
            return Ok(&self.manifest);
        }

        let mut reads = Vec::with_capacity(pending.len());
        for rel in pending {
            let abs = self.repo_root.join(rel);
            let bytes = fs::read(&abs).map_err(|source| BackupError::Read { path: abs, source })?;
            reads.push((rel, bytes));
        }

        for (rel, bytes) in reads {
            let name = backup_name(rel);
            let dest = self.dir.join(&name);
            fs::write(&dest, &bytes).map_err(|source| BackupError::Write { path: dest, source })?;
            self.manifest.entries.insert(
                rel.to_string(),
                BackupEntry {
                    backup_path: name,
                    sha256: sha256_hex(&bytes),
                    bytes: bytes.len() as u64,
                },
            );
            debug!(path = rel, "backed up");
        }

        self.persist()?;
        info!(dir = %self.dir, files = self.manifest.len(), "backup manifest written");
        Ok(&self.manifest)
    }

    fn persist(&self) -> Result<(), BackupError> {
        let json = serde_json::to_string_pretty(&self.manifest)
            .map_err(|e| BackupError::Manifest(e.to_string()))?;
        let path = self.manifest_path();
        fs::write(&path, json).map_err(|source| BackupError::Write { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_are_flat_and_distinct() {
        assert_eq!(backup_name("src/main/A.java"), "src%2Fmain%2FA.java");
        assert_eq!(backup_name("src\\main\\A.java"), "src%2Fmain%2FA.java");
        assert_eq!(backup_name("./pom.xml"), "pom.xml");
        assert_ne!(backup_name("a/b_c"), backup_name("a_b/c"));
        assert_ne!(backup_name("a%2Fb"), backup_name("a/b"));
        assert!(!backup_name("a/b/c").contains('/'));
    }

    #[test]
    fn dir_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 5, 9).unwrap();
        assert_eq!(backup_dir_name("demo", at), "demo_backup_20260301_140509");
    }
}

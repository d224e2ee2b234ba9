//! Error types for migrafix-edit.
//!
//! Application errors distinguish a missing target (the record is skipped)
//! from a structural ambiguity (the record fails). Backup errors are always
//! fatal to the apply phase.

use camino::Utf8PathBuf;
use migrafix_domain::TARGET_NOT_FOUND;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The record is not marked automatic and must not be applied.
    #[error("manual review required")]
    NotAutomatic,

    /// The text to replace is absent from the current content.
    #[error("{TARGET_NOT_FOUND}: {detail}")]
    NotFound { detail: String },

    /// A precondition for a safe replacement does not hold.
    #[error("ambiguous match: {reason}")]
    AmbiguousMatch { reason: String },
}

impl ApplyError {
    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        ApplyError::NotFound {
            detail: detail.into(),
        }
    }

    pub(crate) fn ambiguous(reason: impl Into<String>) -> Self {
        ApplyError::AmbiguousMatch {
            reason: reason.into(),
        }
    }

    /// Whether the record should end as skipped rather than failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, ApplyError::NotAutomatic | ApplyError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup manifest: {0}")]
    Manifest(String),
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("read manifest {path}: {message}")]
    Manifest { path: Utf8PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_a_skip_and_ambiguity_is_not() {
        assert!(ApplyError::not_found("x").is_skip());
        assert!(ApplyError::NotAutomatic.is_skip());
        assert!(!ApplyError::ambiguous("two matches").is_skip());
    }

    #[test]
    fn not_found_message_leads_with_reason() {
        let msg = ApplyError::not_found("`javax.old.Thing` in A.java").to_string();
        assert_eq!(msg, "target text not found: `javax.old.Thing` in A.java");
    }
}

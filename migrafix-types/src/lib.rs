//! Shared DTOs (schemas-as-code) for the migrafix workspace.
//!
//! # Design constraints
//! - These types are serialized to disk as run artifacts.
//! - Prefer adding optional fields over changing semantics.

pub mod analysis;
pub mod apply;
pub mod backup;
pub mod change;
pub mod changeset;
pub mod report;
pub mod source;

use serde::{Deserialize, Serialize};

/// Schema identifiers.
pub mod schema {
    pub const MIGRAFIX_CHANGES_V1: &str = "migrafix.changes.v1";
    pub const MIGRAFIX_APPLY_V1: &str = "migrafix.apply.v1";
    pub const MIGRAFIX_BACKUP_V1: &str = "migrafix.backup.v1";
    pub const MIGRAFIX_REPORT_V1: &str = "migrafix.report.v1";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ToolInfo {
    pub fn migrafix(version: &str) -> Self {
        Self {
            name: "migrafix".to_string(),
            version: Some(version.to_string()),
        }
    }
}

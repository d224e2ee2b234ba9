use crate::ToolInfo;
use crate::change::{ChangeCategory, ChangeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Applied,
    Skipped,
    Failed,
}

impl ApplyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplyStatus::Applied => "applied",
            ApplyStatus::Skipped => "skipped",
            ApplyStatus::Failed => "failed",
        }
    }
}

/// Terminal outcome of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub change_id: ChangeId,
    pub file: String,
    pub category: ChangeCategory,
    pub status: ApplyStatus,

    /// Why the record was skipped or failed. Always set unless applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApplyOutcome {
    pub fn applied(change_id: ChangeId, file: &str, category: ChangeCategory) -> Self {
        Self {
            change_id,
            file: file.to_string(),
            category,
            status: ApplyStatus::Applied,
            reason: None,
        }
    }

    pub fn skipped(
        change_id: ChangeId,
        file: &str,
        category: ChangeCategory,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            change_id,
            file: file.to_string(),
            category,
            status: ApplyStatus::Skipped,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(
        change_id: ChangeId,
        file: &str,
        category: ChangeCategory,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            change_id,
            file: file.to_string(),
            category,
            status: ApplyStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub applied: u64,
    pub skipped: u64,
    pub failed: u64,
    pub files_modified: u64,
}

impl ApplicationSummary {
    pub fn from_outcomes(outcomes: &[ApplyOutcome], files_modified: u64) -> Self {
        let mut s = Self {
            files_modified,
            ..Self::default()
        };
        for o in outcomes {
            match o.status {
                ApplyStatus::Applied => s.applied += 1,
                ApplyStatus::Skipped => s.skipped += 1,
                ApplyStatus::Failed => s.failed += 1,
            }
        }
        s
    }
}

/// On-disk form of the apply phase (`apply.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub summary: ApplicationSummary,

    #[serde(default)]
    pub outcomes: Vec<ApplyOutcome>,

    /// Set when the apply phase was refused as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl ApplicationReport {
    pub fn new(tool: ToolInfo, outcomes: Vec<ApplyOutcome>, files_modified: u64) -> Self {
        Self {
            schema: crate::schema::MIGRAFIX_APPLY_V1.to_string(),
            tool,
            summary: ApplicationSummary::from_outcomes(&outcomes, files_modified),
            outcomes,
            aborted: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_status() {
        let id = ChangeId("x".into());
        let outcomes = vec![
            ApplyOutcome::applied(id.clone(), "A.java", ChangeCategory::NamespaceMigration),
            ApplyOutcome::skipped(id.clone(), "B.java", ChangeCategory::Other, "declined"),
            ApplyOutcome::failed(id, "c.yml", ChangeCategory::ConfigurationProperty, "ambiguous"),
        ];
        let s = ApplicationSummary::from_outcomes(&outcomes, 1);
        assert_eq!((s.applied, s.skipped, s.failed, s.files_modified), (1, 1, 1, 1));
    }
}

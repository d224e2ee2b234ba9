use crate::ToolInfo;
use crate::apply::{ApplicationSummary, ApplyStatus};
use crate::change::{ChangeCategory, ChangeId, ChangeState};
use crate::changeset::ChangeSummary;
use crate::source::{FetchStats, SkippedFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything that happened in one run, with a reason attached to every
/// skip, downgrade and failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub project: String,
    pub run: RunInfo,

    #[serde(default)]
    pub fetch: FetchStats,

    pub analysis: StageNote,
    pub plan: StageNote,

    #[serde(default)]
    pub generation: GenerationStats,

    /// Files not sent for change generation (eligibility rules).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedFile>,

    /// Files whose generation exhausted retries; excluded from the change set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FailedFile>,

    /// Files whose model output could not be recovered; no changes proposed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_files: Vec<SkippedFile>,

    pub changes: ChangeSummary,

    #[serde(default)]
    pub records: Vec<RecordLine>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_aborted: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<VcsReport>,
}

impl MigrationReport {
    pub fn new(tool: ToolInfo, project: impl Into<String>, run: RunInfo) -> Self {
        Self {
            schema: crate::schema::MIGRAFIX_REPORT_V1.to_string(),
            tool,
            project: project.into(),
            run,
            fetch: FetchStats::default(),
            analysis: StageNote::default(),
            plan: StageNote::default(),
            generation: GenerationStats::default(),
            skipped_files: vec![],
            failed_files: vec![],
            degraded_files: vec![],
            changes: ChangeSummary::default(),
            records: vec![],
            application: None,
            apply_aborted: None,
            backup: None,
            vcs: None,
        }
    }

    /// True when something the user asked for did not happen.
    pub fn has_failures(&self) -> bool {
        self.apply_aborted.is_some()
            || self
                .application
                .as_ref()
                .is_some_and(|a| a.failed > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub repo_root: String,
    pub out_dir: String,
    pub apply: bool,
}

/// Outcome of a single repository-level generation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageNote {
    pub used_fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub files_considered: u64,
    pub files_generated: u64,
    pub cache_hits: u64,
    pub retries: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub attempts: u32,
    pub reason: String,
}

/// One record as it ended the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLine {
    pub change_id: ChangeId,
    pub file: String,
    pub category: ChangeCategory,
    pub automatic: bool,
    pub state: ChangeState,
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ApplyStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRef {
    pub manifest_path: String,
    pub files: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default)]
    pub steps: Vec<VcsStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsStep {
    pub name: String,
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

//! The migration pipeline, extracted from the CLI.
//!
//! fetch → analyze → plan → backup → generate → confirm → apply → report.
//! All I/O goes through the port traits; generation goes through a shared
//! [`GenerationContext`].

use crate::generation::{FileGeneration, generate_file_changes, generate_record};
use crate::ports::{ConfirmPort, RepoView, SourceFetcher, VcsPort, WritePort};
use crate::settings::MigrationSettings;
use anyhow::Context;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use migrafix_domain::{
    ChangeClassifier, ContentBudgeter, Decision, NamespaceTable, apply_decision, analysis_prompt,
    build_change_set, change_prompt, limit_files, plan_prompt, skip_reason,
};
use migrafix_edit::{
    BackupVault, FileEdit, MANUAL_REVIEW_REQUIRED, apply_file, backup_dir_name, render_patch,
};
use migrafix_extract::RecordKind;
use migrafix_llm::GenerationContext;
use migrafix_types::ToolInfo;
use migrafix_types::analysis::{AnalysisRecord, MigrationPlan};
use migrafix_types::apply::{ApplicationReport, ApplyOutcome, ApplyStatus};
use migrafix_types::backup::BackupManifest;
use migrafix_types::change::{ChangeId, ChangeRecord, ChangeState, ProposedChange};
use migrafix_types::changeset::{ChangeSet, ChangeSetDocument};
use migrafix_types::report::{
    BackupRef, FailedFile, GenerationStats, MigrationReport, RecordLine, RunInfo, StageNote,
    VcsReport, VcsStep,
};
use migrafix_types::source::{SkippedFile, SourceFile};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DECLINED_BY_REVIEWER: &str = "declined by reviewer";

/// Error type for pipeline results. Exit code 2 = the run finished but the
/// apply phase did not fully succeed, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("apply aborted: {0}")]
    ApplyAborted(String),
    #[error("{0} change(s) failed to apply")]
    RecordsFailed(u64),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::ApplyAborted(_) | ToolError::RecordsFailed(_) => 2,
            ToolError::Internal(_) => 1,
        }
    }
}

/// Collaborators for one run.
pub struct MigrationPorts<'a> {
    pub fetcher: &'a dyn SourceFetcher,
    pub repo: &'a dyn RepoView,
    pub writer: &'a dyn WritePort,
    pub confirm: &'a dyn ConfirmPort,
    pub vcs: Option<&'a dyn VcsPort>,
}

/// Outcome of `run_migration`.
pub struct MigrationOutcome {
    pub changes: ChangeSetDocument,
    pub analysis: AnalysisRecord,
    pub plan: MigrationPlan,
    pub application: Option<ApplicationReport>,
    pub report: MigrationReport,
    pub patch: String,
    pub backup_manifest: Option<BackupManifest>,
}

impl MigrationOutcome {
    /// `Err` when the apply phase was aborted or a record failed.
    pub fn status(&self) -> Result<(), ToolError> {
        if let Some(reason) = &self.report.apply_aborted {
            return Err(ToolError::ApplyAborted(reason.clone()));
        }
        match self.application.as_ref().map(|a| a.summary.failed) {
            Some(n) if n > 0 => Err(ToolError::RecordsFailed(n)),
            _ => Ok(()),
        }
    }
}

/// Run the whole pipeline once.
///
/// Only tool errors (fetch failure, confirm port failure, illegal lifecycle
/// transitions) are returned as `Err`. Generation failures, backup failures
/// and per-record apply failures are recorded in the report; the caller
/// decides the exit status via [`MigrationOutcome::status`].
pub async fn run_migration(
    settings: &MigrationSettings,
    ctx: &GenerationContext,
    ports: MigrationPorts<'_>,
    tool: ToolInfo,
) -> Result<MigrationOutcome, ToolError> {
    let started_at = Utc::now();
    let project = settings.project_name();
    let mut report = MigrationReport::new(
        tool.clone(),
        &project,
        RunInfo {
            started_at,
            ended_at: None,
            repo_root: settings.repo_root.to_string(),
            out_dir: settings.out_dir.to_string(),
            apply: settings.apply,
        },
    );

    // Fetch.
    let fetched = ports.fetcher.fetch().context("fetch sources")?;
    report.fetch = fetched.stats;
    let files = match settings.max_files {
        Some(max) => {
            let (kept, dropped) = limit_files(fetched.files, max);
            if !dropped.is_empty() {
                info!(kept = kept.len(), dropped = dropped.len(), "file limit applied");
            }
            report.skipped_files.extend(dropped.into_iter().map(|f| SkippedFile {
                path: f.path,
                reason: format!("over the file limit ({max})"),
            }));
            kept
        }
        None => fetched.files,
    };
    info!(project = %project, files = files.len(), "migration started");

    // Analyze and plan.
    let (analysis, analysis_note) = analyze(settings, ctx, &project, &files).await;
    report.analysis = analysis_note;
    let (plan, plan_note) = make_plan(settings, ctx, &project, &analysis).await;
    report.plan = plan_note;

    // Backup everything that may be touched before any generation output
    // can reach the working tree.
    let mut vault = None;
    if settings.apply {
        match open_vault(settings, &project, started_at, &files) {
            Ok(v) => vault = Some(v),
            Err(reason) => {
                warn!(reason = %reason, "backup failed; apply phase disabled");
                report.apply_aborted = Some(reason);
            }
        }
    }

    // Generate.
    let mut eligible = Vec::new();
    for file in &files {
        match skip_reason(file, settings.max_analyzable_bytes) {
            Some(reason) => {
                debug!(path = %file.path, reason = %reason, "not sent for generation");
                report.skipped_files.push(SkippedFile {
                    path: file.path.clone(),
                    reason,
                });
            }
            None => eligible.push(file),
        }
    }
    let batches = generate_changes(settings, ctx, &project, &analysis, &eligible, &mut report).await;

    // Classify, verify and merge.
    let table = settings.namespace_table();
    let classifier = ChangeClassifier::new(table);
    let mut set = build_change_set(&classifier, batches);
    info!(
        records = set.len(),
        automatic = set.summary().automatic,
        "change set built"
    );

    // Confirm and apply.
    let (application, patch) = if settings.apply {
        let decision = ports.confirm.confirm(&set).context("confirm changes")?;
        let decided = apply_decision(&mut set, &decision).context("record decision")?;
        info!(
            confirmed = decided.confirmed,
            declined = decided.declined,
            downgraded = decided.downgraded,
            "decision recorded"
        );

        let applied = match (vault.as_mut(), report.apply_aborted.clone()) {
            (Some(vault), None) => {
                let target = ApplyTarget {
                    repo: ports.repo,
                    writer: ports.writer,
                    namespaces: classifier.namespaces(),
                };
                apply_confirmed(&mut set, vault, &target, tool.clone())
            }
            (_, reason) => abort_confirmed(
                &mut set,
                reason.unwrap_or_else(|| "backup unavailable".to_string()),
                tool.clone(),
            ),
        }
        .context("record apply outcomes")?;
        if let Some(reason) = &applied.report.aborted {
            report.apply_aborted.get_or_insert_with(|| reason.clone());
        }

        if settings.git && applied.report.summary.files_modified > 0 {
            if let Some(vcs) = ports.vcs {
                report.vcs = Some(commit_changes(settings, vcs, &applied, started_at));
            }
        }
        let patch = render_patch(&applied.before, &applied.after);
        (Some(applied.report), patch)
    } else {
        (None, preview_patch(&set, ports.repo, classifier.namespaces()))
    };

    // Report.
    let outcomes: BTreeMap<&ChangeId, &ApplyOutcome> = application
        .iter()
        .flat_map(|a| a.outcomes.iter())
        .map(|o| (&o.change_id, o))
        .collect();
    report.records = set
        .records()
        .map(|r| record_line(r, outcomes.get(&r.id).copied()))
        .collect();
    report.changes = set.summary();
    report.application = application.as_ref().map(|a| a.summary.clone());
    let backup_manifest = vault.map(|v| {
        report.backup = Some(BackupRef {
            manifest_path: v.manifest_path().to_string(),
            files: v.manifest().len() as u64,
        });
        v.manifest().clone()
    });

    let counters = ctx.counters();
    report.generation.cache_hits = counters.cache_hits;
    report.generation.retries = counters.retries;
    if let Some(cache) = ctx.cache() {
        if let Err(e) = cache.persist() {
            warn!(error = %format!("{e:#}"), "response cache not persisted");
        }
    }
    report.run.ended_at = Some(Utc::now());

    info!(
        records = report.changes.total,
        failed_files = report.failed_files.len(),
        aborted = report.apply_aborted.is_some(),
        "migration finished"
    );

    Ok(MigrationOutcome {
        changes: ChangeSetDocument::new(tool, &project, set),
        analysis,
        plan,
        application,
        report,
        patch,
        backup_manifest,
    })
}

async fn analyze(
    settings: &MigrationSettings,
    ctx: &GenerationContext,
    project: &str,
    files: &[SourceFile],
) -> (AnalysisRecord, StageNote) {
    if settings.skip_analysis {
        let reason = "analysis step skipped";
        return (AnalysisRecord::skeleton(reason), fallback_note(reason));
    }
    let prompt = analysis_prompt(project, files, settings.budgets);
    match generate_record(ctx, &prompt, RecordKind::Analysis, settings.max_parse_retries).await {
        Ok(g) => {
            let note = g.note();
            (g.extraction.into_analysis(), note)
        }
        Err(failure) => {
            let reason = failure.to_string();
            warn!(error = %reason, "analysis generation failed");
            (AnalysisRecord::skeleton(&reason), fallback_note(&reason))
        }
    }
}

async fn make_plan(
    settings: &MigrationSettings,
    ctx: &GenerationContext,
    project: &str,
    analysis: &AnalysisRecord,
) -> (MigrationPlan, StageNote) {
    if settings.skip_analysis {
        let reason = "plan step skipped";
        return (MigrationPlan::skeleton(reason), fallback_note(reason));
    }
    let prompt = plan_prompt(project, analysis, settings.budgets);
    match generate_record(ctx, &prompt, RecordKind::Plan, settings.max_parse_retries).await {
        Ok(g) => {
            let note = g.note();
            (g.extraction.into_plan(), note)
        }
        Err(failure) => {
            let reason = failure.to_string();
            warn!(error = %reason, "plan generation failed");
            (MigrationPlan::skeleton(&reason), fallback_note(&reason))
        }
    }
}

fn fallback_note(reason: &str) -> StageNote {
    StageNote {
        used_fallback: true,
        note: Some(reason.to_string()),
    }
}

fn open_vault(
    settings: &MigrationSettings,
    project: &str,
    at: DateTime<Utc>,
    files: &[SourceFile],
) -> Result<BackupVault, String> {
    let dir = settings.backup_root().join(backup_dir_name(project, at));
    let mut vault = BackupVault::create(&settings.repo_root, &dir).map_err(|e| e.to_string())?;
    vault
        .snapshot(files.iter().map(|f| f.path.as_str()))
        .map_err(|e| e.to_string())?;
    info!(dir = %dir, files = vault.manifest().len(), "originals backed up");
    Ok(vault)
}

/// Generate every eligible file's proposals on a bounded pool. Returned in
/// discovery order; failed and degraded files are recorded and left out.
async fn generate_changes<'f>(
    settings: &MigrationSettings,
    ctx: &GenerationContext,
    project: &str,
    analysis: &AnalysisRecord,
    eligible: &[&'f SourceFile],
    report: &mut MigrationReport,
) -> Vec<(&'f SourceFile, Vec<ProposedChange>)> {
    let summary = analysis.prompt_context();
    let table = settings.namespace_table();
    let budgeter = ContentBudgeter::new(settings.budgets.per_file);
    let retries = settings.max_parse_retries;

    let jobs: Vec<_> = eligible
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let content = budgeter.budget(&file.path, &file.content);
            let prompt = change_prompt(project, &summary, &file.path, &content, &table);
            (i, *file, prompt)
        })
        .collect();

    let mut results: Vec<(usize, &SourceFile, FileGeneration)> = stream::iter(jobs)
        .map(|(i, file, prompt)| async move {
            let generated = generate_file_changes(ctx, &file.path, &prompt, retries).await;
            (i, file, generated)
        })
        .buffer_unordered(settings.workers.max(1))
        .collect()
        .await;
    results.sort_by_key(|(i, _, _)| *i);

    report.generation = GenerationStats {
        files_considered: eligible.len() as u64,
        ..GenerationStats::default()
    };
    let mut batches = Vec::with_capacity(results.len());
    for (_, file, generated) in results {
        match generated {
            FileGeneration::Proposed(proposals) => {
                report.generation.files_generated += 1;
                batches.push((file, proposals));
            }
            FileGeneration::Degraded(reason) => {
                report.generation.files_generated += 1;
                report.degraded_files.push(SkippedFile {
                    path: file.path.clone(),
                    reason,
                });
            }
            FileGeneration::Failed(failure) => report.failed_files.push(FailedFile {
                path: file.path.clone(),
                attempts: failure.attempts,
                reason: failure.to_string(),
            }),
        }
    }
    batches
}

/// Edits actually made during the apply phase.
pub struct AppliedChanges {
    pub report: ApplicationReport,
    pub before: BTreeMap<String, String>,
    pub after: BTreeMap<String, String>,
}

/// Where confirmed records are read from and written to.
struct ApplyTarget<'a> {
    repo: &'a dyn RepoView,
    writer: &'a dyn WritePort,
    namespaces: &'a NamespaceTable,
}

/// Apply every confirmed record, one read and at most one write per file.
fn apply_confirmed(
    set: &mut ChangeSet,
    vault: &mut BackupVault,
    target: &ApplyTarget<'_>,
    tool: ToolInfo,
) -> anyhow::Result<AppliedChanges> {
    let touched = set.files_to_touch();
    if let Err(e) = vault.snapshot(touched.iter().map(String::as_str)) {
        warn!(error = %e, "backup guard failed; nothing applied");
        return abort_confirmed(set, format!("backup failed: {e}"), tool);
    }

    let mut outcomes: BTreeMap<ChangeId, ApplyOutcome> = BTreeMap::new();
    let mut before = BTreeMap::new();
    let mut after = BTreeMap::new();
    let mut files_modified = 0u64;

    for file in &touched {
        let records: Vec<&ChangeRecord> = set
            .records()
            .filter(|r| &r.file == file && r.state == ChangeState::Confirmed)
            .collect();

        let (original, encoding) = match target.repo.read_text(Utf8Path::new(file)) {
            Ok(decoded) => (decoded.text, decoded.encoding),
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(path = %file, error = %reason, "file unreadable at apply time");
                for r in records.iter().filter(|r| r.is_eligible_for_apply()) {
                    outcomes.insert(
                        r.id.clone(),
                        ApplyOutcome::failed(r.id.clone(), &r.file, r.category, &reason),
                    );
                }
                continue;
            }
        };

        let FileEdit {
            content,
            outcomes: file_outcomes,
        } = apply_file(
            &original,
            records.iter().copied().filter(|r| r.is_eligible_for_apply()),
            target.namespaces,
        );
        let mut file_outcomes = file_outcomes;

        if content != original {
            let written = encoding
                .encode(&content)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| target.writer.write_file(&target.repo.root().join(file), &bytes));
            match written {
                Ok(()) => {
                    files_modified += 1;
                    info!(path = %file, "file updated");
                    before.insert(file.clone(), original);
                    after.insert(file.clone(), content);
                }
                Err(e) => {
                    let reason = format!("write failed: {e:#}");
                    warn!(path = %file, error = %reason, "file not written");
                    for o in file_outcomes.iter_mut().filter(|o| o.status == ApplyStatus::Applied) {
                        *o = ApplyOutcome::failed(o.change_id.clone(), &o.file, o.category, &reason);
                    }
                }
            }
        }
        for o in file_outcomes {
            outcomes.insert(o.change_id.clone(), o);
        }
    }

    let report = settle(set, outcomes, files_modified, None, tool)?;
    Ok(AppliedChanges {
        report,
        before,
        after,
    })
}

/// Skip every confirmed record because the apply phase cannot run.
fn abort_confirmed(
    set: &mut ChangeSet,
    reason: String,
    tool: ToolInfo,
) -> anyhow::Result<AppliedChanges> {
    let mut outcomes = BTreeMap::new();
    for r in set.records().filter(|r| r.state == ChangeState::Confirmed) {
        outcomes.insert(
            r.id.clone(),
            ApplyOutcome::skipped(r.id.clone(), &r.file, r.category, format!("apply aborted: {reason}")),
        );
    }
    let report = settle(set, outcomes, 0, Some(reason), tool)?;
    Ok(AppliedChanges {
        report,
        before: BTreeMap::new(),
        after: BTreeMap::new(),
    })
}

/// Give every decided record a terminal outcome, in change-set order.
///
/// Confirmed records without an outcome are manual-review records and are
/// skipped. Declined records are skipped. Downgraded records keep their state
/// and are reported as skipped with the downgrade note.
fn settle(
    set: &mut ChangeSet,
    mut outcomes: BTreeMap<ChangeId, ApplyOutcome>,
    files_modified: u64,
    aborted: Option<String>,
    tool: ToolInfo,
) -> anyhow::Result<ApplicationReport> {
    let mut ordered = Vec::with_capacity(set.len());
    for record in set.records_mut() {
        let outcome = match record.state {
            ChangeState::Confirmed => outcomes.remove(&record.id).unwrap_or_else(|| {
                ApplyOutcome::skipped(
                    record.id.clone(),
                    &record.file,
                    record.category,
                    downgrade_note(record).unwrap_or(MANUAL_REVIEW_REQUIRED),
                )
            }),
            ChangeState::Declined => ApplyOutcome::skipped(
                record.id.clone(),
                &record.file,
                record.category,
                downgrade_note(record).unwrap_or(DECLINED_BY_REVIEWER),
            ),
            ChangeState::Downgraded => {
                let reason = downgrade_note(record).unwrap_or(MANUAL_REVIEW_REQUIRED).to_string();
                info!(path = %record.file, change = %record.id.short(), reason = %reason, "downgraded change left for manual review");
                ordered.push(ApplyOutcome::skipped(
                    record.id.clone(),
                    &record.file,
                    record.category,
                    reason,
                ));
                continue;
            }
            _ => continue,
        };
        let next = match outcome.status {
            ApplyStatus::Applied => ChangeState::Applied,
            ApplyStatus::Skipped => ChangeState::Skipped,
            ApplyStatus::Failed => ChangeState::Failed,
        };
        record.advance(next)?;
        ordered.push(outcome);
    }

    let mut report = ApplicationReport::new(tool, ordered, files_modified);
    report.aborted = aborted;
    info!(
        applied = report.summary.applied,
        skipped = report.summary.skipped,
        failed = report.summary.failed,
        files_modified,
        "apply finished"
    );
    Ok(report)
}

fn downgrade_note(record: &ChangeRecord) -> Option<&str> {
    if record.passed_through(ChangeState::Downgraded) {
        record.notes.first().map(String::as_str)
    } else {
        None
    }
}

/// Patch the automatic records would produce, without touching the tree.
fn preview_patch(set: &ChangeSet, repo: &dyn RepoView, namespaces: &NamespaceTable) -> String {
    let mut preview = set.clone();
    if apply_decision(&mut preview, &Decision::AcceptAutomatic).is_err() {
        return String::new();
    }
    let mut before = BTreeMap::new();
    let mut after = BTreeMap::new();
    for file in preview.files_to_touch() {
        let Ok(original) = repo.read_text(Utf8Path::new(&file)).map(|d| d.text) else {
            continue;
        };
        let edit = apply_file(
            &original,
            preview.records().filter(|r| r.file == file && r.is_eligible_for_apply()),
            namespaces,
        );
        if edit.changed(&original) {
            after.insert(file.clone(), edit.content);
            before.insert(file, original);
        }
    }
    render_patch(&before, &after)
}

pub fn branch_name(at: DateTime<Utc>) -> String {
    format!("spring-migration-{}", at.format("%Y%m%d_%H%M%S"))
}

pub fn commit_message(project: &str, report: &ApplicationReport) -> String {
    let s = &report.summary;
    format!(
        "Migrate {project} to Spring 6 and the jakarta namespace\n\n\
         Applied {} change(s) across {} file(s); {} skipped, {} failed.\n",
        s.applied, s.files_modified, s.skipped, s.failed
    )
}

/// Branch, stage, commit and optionally push. Stops at the first failing
/// step; never fails the run.
fn commit_changes(
    settings: &MigrationSettings,
    vcs: &dyn VcsPort,
    applied: &AppliedChanges,
    at: DateTime<Utc>,
) -> VcsReport {
    let branch = branch_name(at);
    let files: Vec<String> = applied.after.keys().cloned().collect();
    let message = commit_message(&settings.project_name(), &applied.report);

    let mut report = VcsReport {
        branch: Some(branch.clone()),
        steps: Vec::new(),
    };
    let complete = record_step(&mut report, "create_branch", vcs.create_branch(&branch))
        && record_step(&mut report, "stage_files", vcs.stage_files(&files))
        && record_step(&mut report, "commit", vcs.commit(&message))
        && (!settings.push || record_step(&mut report, "push", vcs.push(&branch)));
    debug!(branch = %branch, complete, "vcs finished");
    report
}

fn record_step(report: &mut VcsReport, name: &str, result: anyhow::Result<()>) -> bool {
    let detail = match result {
        Ok(()) => {
            info!(step = name, "vcs step done");
            None
        }
        Err(e) => {
            let detail = format!("{e:#}");
            warn!(step = name, error = %detail, "vcs step failed");
            Some(detail)
        }
    };
    let ok = detail.is_none();
    report.steps.push(VcsStep {
        name: name.to_string(),
        ok,
        detail,
    });
    ok
}

fn record_line(record: &ChangeRecord, outcome: Option<&ApplyOutcome>) -> RecordLine {
    RecordLine {
        change_id: record.id.clone(),
        file: record.file.clone(),
        category: record.category,
        automatic: record.automatic,
        state: record.state,
        description: record.description.clone(),
        notes: record.notes.clone(),
        outcome: outcome.map(|o| o.status),
        reason: outcome.and_then(|o| o.reason.clone()),
    }
}

/// Write all run artifacts to the output directory.
#[cfg(feature = "artifact-writer")]
pub fn write_migration_artifacts(
    outcome: &MigrationOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    use migrafix_render::{render_apply_md, render_changes_md, render_report_md};

    writer.create_dir_all(out_dir)?;

    let changes_json = serde_json::to_string_pretty(&outcome.changes).context("serialize changes")?;
    writer.write_file(&out_dir.join("changes.json"), changes_json.as_bytes())?;
    writer.write_file(
        &out_dir.join("changes.md"),
        render_changes_md(&outcome.changes).as_bytes(),
    )?;

    if let Some(application) = &outcome.application {
        let apply_json = serde_json::to_string_pretty(application).context("serialize apply")?;
        writer.write_file(&out_dir.join("apply.json"), apply_json.as_bytes())?;
        writer.write_file(
            &out_dir.join("apply.md"),
            render_apply_md(application).as_bytes(),
        )?;
    }

    let analysis_json =
        serde_json::to_string_pretty(&outcome.analysis).context("serialize analysis")?;
    writer.write_file(&out_dir.join("analysis.json"), analysis_json.as_bytes())?;
    let plan_json = serde_json::to_string_pretty(&outcome.plan).context("serialize plan")?;
    writer.write_file(&out_dir.join("plan.json"), plan_json.as_bytes())?;

    writer.write_file(&out_dir.join("patch.diff"), outcome.patch.as_bytes())?;

    let report_json = serde_json::to_string_pretty(&outcome.report).context("serialize report")?;
    writer.write_file(&out_dir.join("report.json"), report_json.as_bytes())?;
    writer.write_file(
        &out_dir.join("report.md"),
        render_report_md(&outcome.report).as_bytes(),
    )?;

    Ok(())
}

//! Rendering helpers (markdown) for human-readable artifacts.

use migrafix_types::apply::{ApplicationReport, ApplyStatus};
use migrafix_types::backup::BackupManifest;
use migrafix_types::change::{ChangeCategory, ChangeRecord, ChangeState};
use migrafix_types::changeset::{ChangeSet, ChangeSetDocument, ChangeSummary};
use migrafix_types::report::MigrationReport;

pub fn render_changes_md(doc: &ChangeSetDocument) -> String {
    let mut out = String::new();
    out.push_str(&format!("# migrafix changes: {}\n\n", doc.project));
    push_summary(&mut out, &doc.summary);

    if doc.changes.is_empty() {
        out.push_str("_No changes proposed._\n");
        return out;
    }

    for (category, records) in &doc.changes.categories {
        if records.is_empty() {
            continue;
        }
        out.push_str(&format!("## {} ({})\n\n", category_label(*category), records.len()));
        for r in records {
            push_record(&mut out, r);
        }
    }
    out
}

fn push_summary(out: &mut String, s: &ChangeSummary) {
    out.push_str(&format!(
        "- Changes: {} (automatic {}, manual review {}, downgraded {})\n",
        s.total, s.automatic, s.manual, s.downgraded
    ));
    for (category, n) in &s.per_category {
        out.push_str(&format!("- {}: {}\n", category_label(*category), n));
    }
    out.push('\n');
}

fn push_record(out: &mut String, r: &ChangeRecord) {
    out.push_str(&format!("### {} `{}`\n\n", r.id.short(), r.file));
    out.push_str(&format!("- Mode: `{}`\n", mode_label(r.automatic)));
    out.push_str(&format!("- State: `{}`\n", r.state.as_str()));
    if !r.line_numbers.is_empty() {
        let lines: Vec<String> = r.line_numbers.iter().map(u64::to_string).collect();
        out.push_str(&format!("- Lines: {}\n", lines.join(", ")));
    }
    if let Some(key) = &r.property {
        out.push_str(&format!("- Property: `{}`\n", key));
    }
    if !r.from_value.is_empty() {
        out.push_str(&format!("- From: `{}`\n", r.from_value));
    }
    if !r.to_value.is_empty() {
        out.push_str(&format!("- To: `{}`\n", r.to_value));
    }
    out.push_str(&format!("\n{}\n", r.description));
    if r.explanation != r.description {
        out.push_str(&format!("\n{}\n", r.explanation));
    }
    if !r.notes.is_empty() {
        out.push_str("\n**Notes**\n\n");
        for n in &r.notes {
            out.push_str(&format!("- {}\n", n));
        }
    }
    out.push('\n');
}

/// Compact one-line-per-record listing for confirmation prompts.
pub fn render_preview(set: &ChangeSet) -> String {
    let mut out = String::new();
    for r in set.records() {
        if !matches!(r.state, ChangeState::Verified | ChangeState::Downgraded) {
            continue;
        }
        let what = match (r.from_value.is_empty(), r.to_value.is_empty()) {
            (false, false) => format!("{} -> {}", r.from_value, r.to_value),
            (false, true) => r.from_value.clone(),
            _ => r.description.clone(),
        };
        out.push_str(&format!(
            "[{}] {:<7} {} {}: {}\n",
            r.id.short(),
            mode_label(r.automatic),
            r.category,
            r.file,
            what
        ));
    }
    out
}

pub fn render_apply_md(report: &ApplicationReport) -> String {
    let mut out = String::new();
    out.push_str("# migrafix apply\n\n");
    if let Some(reason) = &report.aborted {
        out.push_str(&format!("**Apply aborted:** {}\n\n", reason));
    }
    out.push_str(&format!(
        "- Applied: {}\n- Skipped: {}\n- Failed: {}\n- Files modified: {}\n\n",
        report.summary.applied,
        report.summary.skipped,
        report.summary.failed,
        report.summary.files_modified
    ));

    out.push_str("## Results\n\n");
    if report.outcomes.is_empty() {
        out.push_str("_No results._\n");
        return out;
    }

    for o in &report.outcomes {
        out.push_str(&format!(
            "- `{}` {} `{}`",
            status_label(o.status),
            o.change_id.short(),
            o.file
        ));
        if let Some(reason) = &o.reason {
            out.push_str(&format!(": {}", reason));
        }
        out.push('\n');
    }
    out
}

pub fn render_backup_md(manifest: &BackupManifest) -> String {
    let mut out = String::new();
    out.push_str("# migrafix backup\n\n");
    out.push_str(&format!(
        "- Created: {}\n- Source root: `{}`\n- Backup dir: `{}`\n- Files: {}\n\n",
        manifest.created_at.to_rfc3339(),
        manifest.source_root,
        manifest.backup_dir,
        manifest.len()
    ));
    for (path, entry) in &manifest.entries {
        out.push_str(&format!(
            "- `{}` → `{}` ({} bytes, sha256 {})\n",
            path,
            entry.backup_path,
            entry.bytes,
            &entry.sha256[..entry.sha256.len().min(12)]
        ));
    }
    out
}

pub fn render_report_md(report: &MigrationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# migrafix report: {}\n\n", report.project));
    out.push_str(&format!(
        "- Started: {}\n",
        report.run.started_at.to_rfc3339()
    ));
    if let Some(ended) = report.run.ended_at {
        out.push_str(&format!("- Ended: {}\n", ended.to_rfc3339()));
    }
    out.push_str(&format!("- Repository: `{}`\n", report.run.repo_root));
    out.push_str(&format!(
        "- Mode: {}\n\n",
        if report.run.apply { "apply" } else { "dry run" }
    ));

    out.push_str("## Sources\n\n");
    let f = &report.fetch;
    out.push_str(&format!(
        "- Seen: {}\n- Included: {}\n- Excluded by pattern: {}\n- Excluded (too large): {}\n- Unreadable: {}\n",
        f.files_seen, f.files_included, f.excluded_by_pattern, f.excluded_oversize, f.excluded_unreadable
    ));
    if f.decoded_legacy > 0 {
        out.push_str(&format!("- Read as Windows-1252: {}\n", f.decoded_legacy));
    }
    out.push('\n');

    out.push_str("## Generation\n\n");
    let g = &report.generation;
    out.push_str(&format!(
        "- Files considered: {}\n- Files generated: {}\n- Cache hits: {}\n- Retries: {}\n",
        g.files_considered, g.files_generated, g.cache_hits, g.retries
    ));
    for (label, note) in [("Analysis", &report.analysis), ("Plan", &report.plan)] {
        if note.used_fallback {
            out.push_str(&format!(
                "- {}: fallback used ({})\n",
                label,
                note.note.as_deref().unwrap_or("no detail")
            ));
        }
    }
    out.push('\n');

    if !report.failed_files.is_empty() {
        out.push_str("### Failed files\n\n");
        for ff in &report.failed_files {
            out.push_str(&format!(
                "- `{}` after {} attempt(s): {}\n",
                ff.path, ff.attempts, ff.reason
            ));
        }
        out.push('\n');
    }
    if !report.degraded_files.is_empty() {
        out.push_str("### Unrecoverable model output\n\n");
        for d in &report.degraded_files {
            out.push_str(&format!("- `{}`: {}\n", d.path, d.reason));
        }
        out.push('\n');
    }
    if !report.skipped_files.is_empty() {
        out.push_str("### Not sent for generation\n\n");
        for s in &report.skipped_files {
            out.push_str(&format!("- `{}`: {}\n", s.path, s.reason));
        }
        out.push('\n');
    }

    out.push_str("## Changes\n\n");
    push_summary(&mut out, &report.changes);

    if let Some(reason) = &report.apply_aborted {
        out.push_str(&format!("**Apply aborted:** {}\n\n", reason));
    }
    if let Some(a) = &report.application {
        out.push_str(&format!(
            "- Applied: {}\n- Skipped: {}\n- Failed: {}\n- Files modified: {}\n\n",
            a.applied, a.skipped, a.failed, a.files_modified
        ));
    }
    if let Some(b) = &report.backup {
        out.push_str(&format!(
            "Backup of {} file(s): `{}`\n\n",
            b.files, b.manifest_path
        ));
    }

    if !report.records.is_empty() {
        out.push_str("| Change | File | Category | Mode | State | Outcome | Reason |\n");
        out.push_str("|---|---|---|---|---|---|---|\n");
        for r in &report.records {
            let reason = r
                .reason
                .clone()
                .or_else(|| r.notes.last().cloned())
                .unwrap_or_default();
            out.push_str(&format!(
                "| {} | `{}` | {} | {} | {} | {} | {} |\n",
                r.change_id.short(),
                r.file,
                r.category,
                mode_label(r.automatic),
                r.state.as_str(),
                r.outcome.map_or("-", status_label),
                escape_cell(&reason)
            ));
        }
        out.push('\n');
    }

    if let Some(vcs) = &report.vcs {
        out.push_str("## Version control\n\n");
        if let Some(branch) = &vcs.branch {
            out.push_str(&format!("- Branch: `{}`\n", branch));
        }
        for step in &vcs.steps {
            out.push_str(&format!(
                "- {}: {}{}\n",
                step.name,
                if step.ok { "ok" } else { "failed" },
                step.detail
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            ));
        }
    }

    out
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

pub fn category_label(c: ChangeCategory) -> &'static str {
    match c {
        ChangeCategory::NamespaceMigration => "Namespace migration",
        ChangeCategory::SecurityConfig => "Security configuration",
        ChangeCategory::DependencyVersion => "Dependency version",
        ChangeCategory::ConfigurationProperty => "Configuration property",
        ChangeCategory::Other => "Other",
    }
}

fn mode_label(automatic: bool) -> &'static str {
    if automatic { "auto" } else { "manual" }
}

fn status_label(s: ApplyStatus) -> &'static str {
    s.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use migrafix_types::ToolInfo;
    use migrafix_types::apply::ApplyOutcome;
    use migrafix_types::change::ChangeId;
    use migrafix_types::report::{FailedFile, RecordLine, RunInfo};
    use pretty_assertions::assert_eq;

    fn run() -> RunInfo {
        RunInfo {
            started_at: Utc::now(),
            ended_at: None,
            repo_root: "/repo".into(),
            out_dir: "/repo/out".into(),
            apply: true,
        }
    }

    #[test]
    fn empty_change_set() {
        let doc = ChangeSetDocument::new(ToolInfo::migrafix("0.0.0"), "demo", ChangeSet::default());
        let md = render_changes_md(&doc);
        assert!(md.starts_with("# migrafix changes: demo\n"));
        assert!(md.ends_with("_No changes proposed._\n"));
    }

    #[test]
    fn apply_md_lists_reasons() {
        let outcomes = vec![
            ApplyOutcome::applied(ChangeId("aaaaaaaa-1".into()), "A.java", ChangeCategory::NamespaceMigration),
            ApplyOutcome::skipped(
                ChangeId("bbbbbbbb-2".into()),
                "B.java",
                ChangeCategory::NamespaceMigration,
                "target text not found: `javax.old.Thing` does not occur in B.java",
            ),
        ];
        let report = ApplicationReport::new(ToolInfo::migrafix("0.0.0"), outcomes, 1);
        let md = render_apply_md(&report);
        assert!(md.contains("- Applied: 1\n- Skipped: 1\n- Failed: 0\n- Files modified: 1\n"));
        assert!(md.contains("- `skipped` bbbbbbbb `B.java`: target text not found"));
    }

    #[test]
    fn report_md_surfaces_failures_and_reasons() {
        let mut report = MigrationReport::new(ToolInfo::migrafix("0.0.0"), "demo", run());
        report.failed_files.push(FailedFile {
            path: "Slow.java".into(),
            attempts: 5,
            reason: "generation timed out after 50s".into(),
        });
        report.apply_aborted = Some("backup failed: read pom.xml".into());
        report.fetch.decoded_legacy = 2;
        report.records.push(RecordLine {
            change_id: ChangeId("cccccccc-3".into()),
            file: "C.java".into(),
            category: ChangeCategory::Other,
            automatic: false,
            state: ChangeState::Downgraded,
            description: "x".into(),
            notes: vec!["target text not found | here".into()],
            outcome: None,
            reason: None,
        });
        let md = render_report_md(&report);
        assert!(md.contains("- `Slow.java` after 5 attempt(s): generation timed out after 50s\n"));
        assert!(md.contains("**Apply aborted:** backup failed: read pom.xml"));
        assert!(md.contains("- Unreadable: 0\n- Read as Windows-1252: 2\n\n"));
        assert!(md.contains("| cccccccc | `C.java` | other | manual | downgraded | - | target text not found \\| here |"));
    }

    #[test]
    fn labels() {
        assert_eq!(category_label(ChangeCategory::SecurityConfig), "Security configuration");
        assert_eq!(mode_label(true), "auto");
    }
}

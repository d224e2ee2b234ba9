//! Extraction of realistic model outputs.

use migrafix_extract::{Extracted, RecordKind, extract};
use pretty_assertions::assert_eq;

#[test]
fn empty_string_falls_back_for_every_kind() {
    for kind in [RecordKind::Analysis, RecordKind::Plan, RecordKind::Changes] {
        let ex = extract("", kind);
        assert!(ex.used_fallback(), "{kind:?}");
    }
}

#[test]
fn prose_before_and_after_fence() {
    let raw = "I reviewed the file. Below are the changes.\n\n```json\n{\n  \"javax_to_jakarta\": [\n    {\"file\": \"src/main/java/com/acme/User.java\", \"from\": \"javax.persistence.Entity\", \"to\": \"jakarta.persistence.Entity\", \"description\": \"Update JPA import\"}\n  ]\n}\n```\n\nLet me know if you need anything else {really}.";
    let ex = extract(raw, RecordKind::Changes);
    assert!(!ex.used_fallback());
    let changes = ex.into_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].description, "Update JPA import");
}

#[test]
fn trailing_commas_everywhere() {
    let raw = r#"{"dependency_updates": [{"file": "pom.xml", "from": "5.3.30", "to": "6.1.4",},], "other_changes": [],}"#;
    let ex = extract(raw, RecordKind::Changes);
    assert!(ex.repaired);
    assert_eq!(ex.into_changes()[0].to, "6.1.4");
}

#[test]
fn bare_array_of_changes() {
    let raw = r#"[{"category": "spring_security_updates", "file": "SecurityConfig.java", "from": "WebSecurityConfigurerAdapter", "to": "SecurityFilterChain"}]"#;
    let changes = extract(raw, RecordKind::Changes).into_changes();
    assert_eq!(changes[0].bucket, "spring_security_updates");
}

#[test]
fn truncated_analysis_keeps_summary() {
    let raw = r#"```json
{"executive_summary": {"migration_impact": "Medium", "key_blockers": ["javax.servlet filters"], "recommended_approach": "Incremental"},
 "module_breakdown": [{"module": "web", "complexity": "hi"#;
    let ex = extract(raw, RecordKind::Analysis);
    assert!(!ex.used_fallback());
    let rec = ex.into_analysis();
    assert_eq!(rec.executive_summary.migration_impact, "Medium");
    assert_eq!(rec.blocker_lines(), vec!["javax.servlet filters".to_string()]);
}

#[test]
fn plan_with_all_sections() {
    let raw = r#"{"migration_strategy": {"approach": "phased"}, "phase_breakdown": [{"phase": 1}], "automation_recommendations": {"openrewrite": true}, "testing_strategy": {"unit": "full"}}"#;
    match extract(raw, RecordKind::Plan).record {
        Extracted::Plan(plan) => assert_eq!(plan.phase_breakdown.len(), 1),
        other => panic!("expected plan, got {other:?}"),
    }
}

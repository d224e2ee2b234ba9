use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Repository-wide migration analysis. Consumed only as prompt input for the
/// plan and change-generation steps; every section is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default)]
    pub executive_summary: ExecutiveSummary,

    #[serde(default)]
    pub detailed_analysis: Map<String, Value>,

    #[serde(default)]
    pub module_breakdown: Vec<Value>,

    #[serde(default)]
    pub effort_estimation: Map<String, Value>,

    #[serde(default)]
    pub migration_roadmap: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    #[serde(default)]
    pub migration_impact: String,

    #[serde(default)]
    pub key_blockers: Vec<Value>,

    #[serde(default)]
    pub recommended_approach: String,
}

impl AnalysisRecord {
    /// Minimal record used when the model output cannot be recovered.
    pub fn skeleton(reason: &str) -> Self {
        Self {
            executive_summary: ExecutiveSummary {
                migration_impact: "Unknown: automated analysis unavailable".to_string(),
                key_blockers: vec![Value::String(reason.to_string())],
                recommended_approach: "Manual analysis required".to_string(),
            },
            ..Self::default()
        }
    }

    /// Key blockers as display strings; structured entries are rendered as
    /// compact JSON.
    pub fn blocker_lines(&self) -> Vec<String> {
        self.executive_summary
            .key_blockers
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    /// Short text block injected into per-file prompts.
    pub fn prompt_context(&self) -> String {
        let es = &self.executive_summary;
        let mut out = String::new();
        if !es.migration_impact.is_empty() {
            out.push_str(&format!("Impact: {}\n", es.migration_impact));
        }
        if !es.recommended_approach.is_empty() {
            out.push_str(&format!("Approach: {}\n", es.recommended_approach));
        }
        for b in self.blocker_lines() {
            out.push_str(&format!("Blocker: {b}\n"));
        }
        out
    }
}

/// Phased migration plan derived from the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    #[serde(default)]
    pub migration_strategy: Value,

    #[serde(default)]
    pub phase_breakdown: Vec<Value>,

    #[serde(default)]
    pub automation_recommendations: Value,

    #[serde(default)]
    pub testing_strategy: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MigrationPlan {
    /// Keys a model-produced plan must carry to be accepted.
    pub const REQUIRED_KEYS: [&'static str; 4] = [
        "migration_strategy",
        "phase_breakdown",
        "automation_recommendations",
        "testing_strategy",
    ];

    pub fn skeleton(reason: &str) -> Self {
        let mut strategy = Map::new();
        strategy.insert(
            "approach".to_string(),
            Value::String("Manual planning required".to_string()),
        );
        strategy.insert("note".to_string(), Value::String(reason.to_string()));
        Self {
            migration_strategy: Value::Object(strategy),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_analysis_fills_defaults() {
        let rec: AnalysisRecord = serde_json::from_value(json!({
            "executive_summary": {"migration_impact": "High"}
        }))
        .unwrap();
        assert_eq!(rec.executive_summary.migration_impact, "High");
        assert!(rec.module_breakdown.is_empty());
    }

    #[test]
    fn blockers_accept_structured_entries() {
        let rec: AnalysisRecord = serde_json::from_value(json!({
            "executive_summary": {"key_blockers": ["javax.servlet", {"lib": "old"}]}
        }))
        .unwrap();
        assert_eq!(
            rec.blocker_lines(),
            vec!["javax.servlet".to_string(), r#"{"lib":"old"}"#.to_string()]
        );
    }

    #[test]
    fn skeleton_mentions_reason() {
        let rec = AnalysisRecord::skeleton("unparseable output");
        assert!(rec.prompt_context().contains("unparseable output"));
    }

    #[test]
    fn plan_keeps_unknown_keys() {
        let plan: MigrationPlan = serde_json::from_value(json!({
            "migration_strategy": {"approach": "phased"},
            "phase_breakdown": [],
            "automation_recommendations": [],
            "testing_strategy": {},
            "risk_matrix": {"high": 1}
        }))
        .unwrap();
        assert!(plan.extra.contains_key("risk_matrix"));
    }
}

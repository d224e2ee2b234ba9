//! Shape validation and normalization of parsed payloads.

use migrafix_types::analysis::{AnalysisRecord, MigrationPlan};
use migrafix_types::change::{ChangeCategory, ProposedChange};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("expected a JSON object, found {0}")]
    NotObject(&'static str),

    #[error("`{key}` must be {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
    },

    #[error("missing required key `{0}`")]
    Missing(String),

    #[error("no recognizable {0} sections")]
    Unrecognized(&'static str),
}

const ANALYSIS_KEYS: [&str; 5] = [
    "executive_summary",
    "detailed_analysis",
    "module_breakdown",
    "effort_estimation",
    "migration_roadmap",
];

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_object(v: Value) -> Result<Map<String, Value>, ShapeError> {
    match v {
        Value::Object(m) => Ok(m),
        other => Err(ShapeError::NotObject(type_name(&other))),
    }
}

/// Wrap scalars and objects so list-typed sections always hold an array.
fn listify(v: Value) -> Value {
    match v {
        Value::Array(_) => v,
        Value::Null => Value::Array(vec![]),
        other => Value::Array(vec![other]),
    }
}

fn objectify(v: Value) -> Value {
    match v {
        Value::Object(_) => v,
        Value::Null => Value::Object(Map::new()),
        other => {
            let mut m = Map::new();
            m.insert("value".to_string(), other);
            Value::Object(m)
        }
    }
}

fn stringify(v: Value) -> Value {
    match v {
        Value::String(_) => v,
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    }
}

pub fn to_analysis(v: Value) -> Result<AnalysisRecord, ShapeError> {
    let mut m = as_object(v)?;
    if !ANALYSIS_KEYS.iter().any(|k| m.contains_key(*k)) {
        return Err(ShapeError::Unrecognized("analysis"));
    }

    if let Some(es) = m.remove("executive_summary") {
        let mut es = match es {
            Value::Object(es) => es,
            Value::Null => Map::new(),
            _ => {
                return Err(ShapeError::WrongType {
                    key: "executive_summary".to_string(),
                    expected: "an object",
                });
            }
        };
        for key in ["migration_impact", "recommended_approach"] {
            if let Some(v) = es.remove(key) {
                es.insert(key.to_string(), stringify(v));
            }
        }
        if let Some(v) = es.remove("key_blockers") {
            es.insert("key_blockers".to_string(), listify(v));
        }
        m.insert("executive_summary".to_string(), Value::Object(es));
    }
    for key in ["module_breakdown", "migration_roadmap"] {
        if let Some(v) = m.remove(key) {
            m.insert(key.to_string(), listify(v));
        }
    }
    for key in ["detailed_analysis", "effort_estimation"] {
        if let Some(v) = m.remove(key) {
            m.insert(key.to_string(), objectify(v));
        }
    }

    serde_json::from_value(Value::Object(m)).map_err(|_| ShapeError::Unrecognized("analysis"))
}

pub fn to_plan(v: Value) -> Result<MigrationPlan, ShapeError> {
    let mut m = as_object(v)?;
    for key in MigrationPlan::REQUIRED_KEYS {
        if !m.contains_key(key) {
            return Err(ShapeError::Missing(key.to_string()));
        }
    }
    if let Some(v) = m.remove("phase_breakdown") {
        m.insert("phase_breakdown".to_string(), listify(v));
    }
    serde_json::from_value(Value::Object(m)).map_err(|_| ShapeError::Unrecognized("plan"))
}

/// Accepts the bucketed object form or a bare array of entries. Entries that
/// are not objects are dropped.
pub fn to_changes(v: Value) -> Result<Vec<ProposedChange>, ShapeError> {
    let mut out = Vec::new();
    match v {
        Value::Array(entries) => {
            for entry in entries {
                if let Value::Object(obj) = entry {
                    let bucket = str_field(&obj, &["category", "bucket"]);
                    out.push(proposed(&bucket, &obj));
                }
            }
        }
        Value::Object(mut m) => {
            if let Some(inner) = m.remove("changes") {
                if m.keys().all(|k| ChangeCategory::from_bucket(k).is_none()) {
                    return to_changes(inner);
                }
            }
            for category in ChangeCategory::ALL {
                let key = category.bucket();
                match m.remove(key) {
                    None | Some(Value::Null) => {}
                    Some(Value::Array(entries)) => {
                        for entry in entries {
                            if let Value::Object(obj) = entry {
                                out.push(proposed(key, &obj));
                            }
                        }
                    }
                    Some(_) => {
                        return Err(ShapeError::WrongType {
                            key: key.to_string(),
                            expected: "an array",
                        });
                    }
                }
            }
        }
        other => return Err(ShapeError::NotObject(type_name(&other))),
    }
    Ok(out)
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    for k in keys {
        match obj.get(*k) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            Some(Value::Bool(b)) => return b.to_string(),
            _ => {}
        }
    }
    String::new()
}

fn opt_str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let s = str_field(obj, keys);
    (!s.trim().is_empty()).then_some(s)
}

fn line_numbers(v: Option<&Value>) -> Vec<u64> {
    let one = |v: &Value| -> Option<u64> {
        match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(one).filter(|n| *n > 0).collect(),
        Some(other) => one(other).filter(|n| *n > 0).into_iter().collect(),
        None => vec![],
    }
}

fn bool_field(v: Option<&Value>) -> Option<bool> {
    match v {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn proposed(bucket: &str, obj: &Map<String, Value>) -> ProposedChange {
    let mut from = str_field(obj, &["from", "from_value", "old_value", "old"]);
    let mut to = str_field(obj, &["to", "to_value", "new_value", "new"]);
    let mut property = opt_str_field(obj, &["property", "key", "property_name"]);

    // A renamed key: the key itself is the text being replaced.
    let from_property = opt_str_field(obj, &["from_property"]);
    let to_property = opt_str_field(obj, &["to_property"]);
    if let (Some(fp), Some(tp)) = (from_property, to_property) {
        if fp != tp && from.is_empty() && to.is_empty() {
            from = fp;
            to = tp;
        } else if property.is_none() && fp == tp {
            property = Some(fp);
        }
    }

    ProposedChange {
        bucket: bucket.to_string(),
        file: str_field(obj, &["file", "path", "file_path"]),
        kind: str_field(obj, &["type", "kind", "change_type"]),
        from,
        to,
        property,
        description: str_field(obj, &["description", "summary"]),
        explanation: str_field(obj, &["explanation", "reason", "rationale"]),
        line_numbers: line_numbers(obj.get("line_numbers").or_else(|| obj.get("lines"))),
        automatic: bool_field(obj.get("automatic")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn bucketed_changes_keep_bucket_and_order() {
        let changes = to_changes(json!({
            "javax_to_jakarta": [
                {"file": "A.java", "from": "javax.persistence", "to": "jakarta.persistence"},
                {"file": "A.java", "from": "javax.validation", "to": "jakarta.validation"}
            ],
            "other_changes": [{"file": "B.java", "description": "rewrite"}]
        }))
        .unwrap();
        let got: Vec<_> = changes
            .iter()
            .map(|c| (c.bucket.as_str(), c.from.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("javax_to_jakarta", "javax.persistence"),
                ("javax_to_jakarta", "javax.validation"),
                ("other_changes", ""),
            ]
        );
    }

    #[test]
    fn empty_object_is_an_empty_change_list() {
        assert!(to_changes(json!({})).unwrap().is_empty());
    }

    #[test]
    fn bucket_with_wrong_type_is_rejected() {
        let err = to_changes(json!({"dependency_updates": "none"})).unwrap_err();
        assert_eq!(
            err,
            ShapeError::WrongType {
                key: "dependency_updates".into(),
                expected: "an array"
            }
        );
    }

    #[test]
    fn lenient_entry_fields() {
        let changes = to_changes(json!([{
            "category": "configuration_updates",
            "path": "application.properties",
            "key": "server.port",
            "old_value": 8080,
            "new_value": "9090",
            "line_numbers": ["3", 0, 7],
            "automatic": "yes"
        }]))
        .unwrap();
        let c = &changes[0];
        assert_eq!(c.bucket, "configuration_updates");
        assert_eq!(c.file, "application.properties");
        assert_eq!(c.property.as_deref(), Some("server.port"));
        assert_eq!((c.from.as_str(), c.to.as_str()), ("8080", "9090"));
        assert_eq!(c.line_numbers, vec![3, 7]);
        assert_eq!(c.automatic, Some(true));
    }

    #[test]
    fn property_rename_becomes_text_replacement() {
        let changes = to_changes(json!({"configuration_updates": [{
            "from_property": "spring.redis.host",
            "to_property": "spring.data.redis.host"
        }]}))
        .unwrap();
        assert_eq!(changes[0].from, "spring.redis.host");
        assert_eq!(changes[0].to, "spring.data.redis.host");
        assert_eq!(changes[0].property, None);
    }

    #[test]
    fn analysis_sections_are_normalized() {
        let rec = to_analysis(json!({
            "executive_summary": {"migration_impact": 3, "key_blockers": "security"},
            "module_breakdown": {"name": "core"}
        }))
        .unwrap();
        assert_eq!(rec.executive_summary.migration_impact, "3");
        assert_eq!(rec.blocker_lines(), vec!["security".to_string()]);
        assert_eq!(rec.module_breakdown.len(), 1);
    }

    #[test]
    fn analysis_requires_a_known_section() {
        assert_eq!(
            to_analysis(json!({"hello": 1})).unwrap_err(),
            ShapeError::Unrecognized("analysis")
        );
        assert_eq!(
            to_analysis(json!([1])).unwrap_err(),
            ShapeError::NotObject("array")
        );
    }

    #[test]
    fn plan_requires_all_keys() {
        let err = to_plan(json!({
            "migration_strategy": {},
            "phase_breakdown": []
        }))
        .unwrap_err();
        assert_eq!(err, ShapeError::Missing("automation_recommendations".into()));
    }
}

//! Recovery of structured records from raw language-model output.
//!
//! [`extract`] is total: every input string yields an [`Extraction`]. The
//! pipeline is isolate → strict parse + shape check → repair → fallback, and
//! callers branch on [`Extraction::used_fallback`] to decide whether to
//! regenerate or accept the degraded record.

mod isolate;
mod repair;
mod shape;

pub use isolate::isolate_payload;
pub use repair::repair;
pub use shape::ShapeError;

use migrafix_types::analysis::{AnalysisRecord, MigrationPlan};
use migrafix_types::change::ProposedChange;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on truncate-and-repair attempts for one payload.
const MAX_TRUNCATIONS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Analysis,
    Plan,
    Changes,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Analysis => "analysis",
            RecordKind::Plan => "plan",
            RecordKind::Changes => "changes",
        }
    }
}

/// Closed set of records the extractor can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Analysis(AnalysisRecord),
    Plan(MigrationPlan),
    Changes(Vec<ProposedChange>),
    Fallback(FallbackRecord),
}

/// Marker for output that could not be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRecord {
    pub kind: RecordKind,
    pub reason: String,
}

impl FallbackRecord {
    pub fn analysis(&self) -> AnalysisRecord {
        AnalysisRecord::skeleton(&self.reason)
    }

    pub fn plan(&self) -> MigrationPlan {
        MigrationPlan::skeleton(&self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: Extracted,
    /// The payload only parsed after repair or truncation.
    pub repaired: bool,
}

impl Extraction {
    pub fn used_fallback(&self) -> bool {
        matches!(self.record, Extracted::Fallback(_))
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.record {
            Extracted::Fallback(f) => Some(&f.reason),
            _ => None,
        }
    }

    pub fn into_parts(self) -> (Extracted, bool) {
        let used_fallback = self.used_fallback();
        (self.record, used_fallback)
    }

    /// Analysis record, or the documented skeleton on fallback.
    pub fn into_analysis(self) -> AnalysisRecord {
        match self.record {
            Extracted::Analysis(a) => a,
            Extracted::Fallback(f) => f.analysis(),
            _ => AnalysisRecord::skeleton("unexpected record kind"),
        }
    }

    pub fn into_plan(self) -> MigrationPlan {
        match self.record {
            Extracted::Plan(p) => p,
            Extracted::Fallback(f) => f.plan(),
            _ => MigrationPlan::skeleton("unexpected record kind"),
        }
    }

    /// Proposed changes; empty on fallback.
    pub fn into_changes(self) -> Vec<ProposedChange> {
        match self.record {
            Extracted::Changes(c) => c,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
enum ExtractError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty payload")]
    Empty,

    #[error("shape: {0}")]
    Shape(#[from] ShapeError),
}

fn parse_first(text: &str) -> Result<Value, ExtractError> {
    // The stream parser stops after the first complete value, so trailing
    // prose after the payload is not an error.
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(e.into()),
        None => Err(ExtractError::Empty),
    }
}

fn shaped(kind: RecordKind, v: Value) -> Result<Extracted, ExtractError> {
    Ok(match kind {
        RecordKind::Analysis => Extracted::Analysis(shape::to_analysis(v)?),
        RecordKind::Plan => Extracted::Plan(shape::to_plan(v)?),
        RecordKind::Changes => Extracted::Changes(shape::to_changes(v)?),
    })
}

fn attempt(text: &str, kind: RecordKind) -> Result<Extracted, ExtractError> {
    shaped(kind, parse_first(text)?)
}

fn fallback(kind: RecordKind, reason: String) -> Extraction {
    Extraction {
        record: Extracted::Fallback(FallbackRecord { kind, reason }),
        repaired: false,
    }
}

/// Recover a `kind` record from `raw`. Never panics.
pub fn extract(raw: &str, kind: RecordKind) -> Extraction {
    let payload = isolate_payload(raw);
    if payload.is_empty() {
        debug!(kind = kind.as_str(), len = raw.len(), "no structured payload in output");
        return fallback(kind, "no structured payload found in model output".to_string());
    }

    let strict_err = match attempt(payload, kind) {
        Ok(record) => {
            return Extraction {
                record,
                repaired: false,
            };
        }
        Err(e) => e,
    };
    debug!(kind = kind.as_str(), error = %strict_err, "strict parse failed; repairing");

    if let Ok(record) = attempt(&repair(payload), kind) {
        return Extraction {
            record,
            repaired: true,
        };
    }

    // Drop the trailing partial element and try again, moving left one
    // structural comma at a time.
    let commas = isolate::structural_commas(payload);
    for &cut in commas.iter().rev().take(MAX_TRUNCATIONS) {
        if let Ok(record) = attempt(&repair(&payload[..cut]), kind) {
            debug!(kind = kind.as_str(), cut, "payload recovered after truncation");
            return Extraction {
                record,
                repaired: true,
            };
        }
    }

    warn!(kind = kind.as_str(), error = %strict_err, "model output unrecoverable; using fallback record");
    fallback(kind, format!("model output could not be parsed: {strict_err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn well_formed_changes() {
        let raw = r#"```json
{"javax_to_jakarta": [{"file": "A.java", "from": "javax.persistence", "to": "jakarta.persistence"}]}
```"#;
        let ex = extract(raw, RecordKind::Changes);
        assert!(!ex.used_fallback());
        assert!(!ex.repaired);
        assert_eq!(ex.into_changes().len(), 1);
    }

    #[test]
    fn missing_closers_are_repaired() {
        let raw = r#"Here you go: {"javax_to_jakarta": [{"file": "A.java", "from": "javax.servlet", "to": "jakarta.servlet"}"#;
        let ex = extract(raw, RecordKind::Changes);
        assert!(ex.repaired);
        let changes = ex.into_changes();
        assert_eq!(changes[0].to, "jakarta.servlet");
    }

    #[test]
    fn partial_trailing_entry_is_kept_without_fields() {
        let raw = r#"{"javax_to_jakarta": [{"file": "A.java", "from": "javax.a", "to": "jakarta.a"}, {"file": "A.java", "fro"#;
        let changes = extract(raw, RecordKind::Changes).into_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].from, "");
    }

    #[test]
    fn prose_falls_back() {
        let ex = extract("Sorry, I cannot help with that.", RecordKind::Changes);
        assert!(ex.used_fallback());
        assert!(ex.fallback_reason().is_some());
        let (record, used) = ex.into_parts();
        assert!(used);
        assert!(matches!(record, Extracted::Fallback(FallbackRecord { kind: RecordKind::Changes, .. })));
    }

    #[test]
    fn analysis_fallback_is_skeleton() {
        let ex = extract("{\"unrelated\": true}", RecordKind::Analysis);
        assert!(ex.used_fallback());
        let rec = ex.into_analysis();
        assert_eq!(rec.executive_summary.recommended_approach, "Manual analysis required");
    }

    #[test]
    fn plan_missing_keys_falls_back() {
        let ex = extract(r#"{"migration_strategy": {}}"#, RecordKind::Plan);
        assert!(ex.used_fallback());
        assert_eq!(
            ex.into_plan().migration_strategy["approach"],
            "Manual planning required"
        );
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = extract("{{{{", RecordKind::Analysis);
        let b = extract("{{{{", RecordKind::Analysis);
        assert_eq!(a, b);
    }
}

//! Property-based tests for extractor totality.
//!
//! These tests verify that:
//! - Any input string yields a record and a fallback flag, never a panic
//! - Truncating a well-formed payload anywhere still yields a record
//! - Fallback decisions are deterministic

use migrafix_extract::{Extracted, RecordKind, extract, repair};
use proptest::prelude::*;

const KINDS: [RecordKind; 3] = [RecordKind::Analysis, RecordKind::Plan, RecordKind::Changes];

const WELL_FORMED: &str = r#"```json
{
  "javax_to_jakarta": [
    {"file": "src/A.java", "type": "import_replacement", "from": "javax.persistence", "to": "jakarta.persistence", "line_numbers": [3, 4], "automatic": true}
  ],
  "configuration_updates": [
    {"file": "application.properties", "property": "server.port", "from": "8080", "to": "9090"}
  ],
  "other_changes": []
}
```"#;

/// Strategy producing JSON-ish fragments: brackets, quotes, commas and words.
fn arb_jsonish() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("{".to_string()),
            Just("}".to_string()),
            Just("[".to_string()),
            Just("]".to_string()),
            Just("\"".to_string()),
            Just(",".to_string()),
            Just(":".to_string()),
            Just("\\".to_string()),
            Just("```json".to_string()),
            Just("```".to_string()),
            Just("\"javax_to_jakarta\"".to_string()),
            "[a-z ]{0,6}",
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn arbitrary_strings_never_panic(raw in ".*") {
        for kind in KINDS {
            let ex = extract(&raw, kind);
            let _ = ex.used_fallback();
        }
    }

    #[test]
    fn jsonish_fragments_never_panic(raw in arb_jsonish()) {
        for kind in KINDS {
            let (record, used_fallback) = extract(&raw, kind).into_parts();
            prop_assert_eq!(used_fallback, matches!(record, Extracted::Fallback(_)));
        }
    }

    #[test]
    fn any_prefix_of_valid_output_yields_a_record(cut in 0usize..WELL_FORMED.len()) {
        let end = (0..=cut).rev().find(|i| WELL_FORMED.is_char_boundary(*i)).unwrap_or(0);
        let ex = extract(&WELL_FORMED[..end], RecordKind::Changes);
        // Either recovered some prefix of the changes or fell back; both are records.
        let n = ex.clone().into_changes().len();
        prop_assert!(n <= 2);
        if ex.used_fallback() {
            prop_assert_eq!(n, 0);
        }
    }

    #[test]
    fn extraction_is_deterministic(raw in arb_jsonish()) {
        prop_assert_eq!(extract(&raw, RecordKind::Changes), extract(&raw, RecordKind::Changes));
    }

    #[test]
    fn repair_output_is_bounded(raw in arb_jsonish()) {
        // At most one closer and one `null` per bracket, plus a closing quote.
        let out = repair(&raw);
        prop_assert!(out.len() <= raw.len() * 6 + 1);
    }
}

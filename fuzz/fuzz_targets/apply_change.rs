#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use migrafix_domain::ChangeClassifier;
use migrafix_edit::apply_change;
use migrafix_types::change::{ChangeState, ProposedChange};
use migrafix_types::source::SourceFile;

#[derive(Debug, Arbitrary)]
struct Input {
    content: String,
    from: String,
    to: String,
}

fuzz_target!(|input: Input| {
    let file = SourceFile::new("src/main/java/A.java", input.content.clone());
    let proposed = ProposedChange {
        from: input.from,
        to: input.to,
        ..Default::default()
    };
    let classifier = ChangeClassifier::default();
    let mut record = classifier.classify(&proposed, &file, 0);
    if !record.automatic || record.advance(ChangeState::Confirmed).is_err() {
        return;
    }

    let Ok(out) = apply_change(&record, &input.content, classifier.namespaces()) else { return };
    if !input.content.contains("jakarta.jakarta") {
        assert!(!out.contains("jakarta.jakarta"), "double prefix from {:?}", record.from_value);
    }
    // The target text is gone, so the same record cannot apply twice.
    if record.from_value != record.to_value {
        assert!(apply_change(&record, &out, classifier.namespaces()).is_err());
    }
});

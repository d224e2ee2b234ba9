//! Single-threaded merge of per-file generation results.

use crate::classify::ChangeClassifier;
use migrafix_types::change::ProposedChange;
use migrafix_types::changeset::ChangeSet;
use migrafix_types::source::SourceFile;
use tracing::debug;

/// Classify and verify each file's proposals and group them by category.
///
/// `batches` must be in file discovery order; within a file the model's order
/// is kept. Proposals naming another file are attributed to the file they
/// were generated for.
pub fn build_change_set<'a, I>(classifier: &ChangeClassifier, batches: I) -> ChangeSet
where
    I: IntoIterator<Item = (&'a SourceFile, Vec<ProposedChange>)>,
{
    let mut set = ChangeSet::default();
    for (file, proposals) in batches {
        for (ordinal, proposed) in proposals.iter().enumerate() {
            let named = proposed.file.trim();
            if !named.is_empty() && named != file.path && !file.path.ends_with(named) {
                debug!(
                    file = %file.path,
                    named = %named,
                    "proposal named a different file; attributing to generated file"
                );
            }
            set.push(classifier.classify(proposed, file, ordinal));
        }
    }
    set
}

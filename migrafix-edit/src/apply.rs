//! Pure application of one change record to file content.

use crate::error::ApplyError;
use migrafix_domain::{
    Assignment, NamespaceTable, dotted_name_at, find_assignments, token_occurrences,
};
use migrafix_types::change::{ChangeCategory, ChangeRecord};
use migrafix_types::source::file_extension;
use std::ops::Range;

/// Apply `record` to `content` and return the new content.
///
/// The function never touches the filesystem. A record whose target text is
/// absent yields [`ApplyError::NotFound`], so a second application of the same
/// record is rejected instead of transforming the content twice. Namespace
/// occurrences under a package `namespaces` excludes are never rewritten.
pub fn apply_change(
    record: &ChangeRecord,
    content: &str,
    namespaces: &NamespaceTable,
) -> Result<String, ApplyError> {
    if !record.automatic {
        return Err(ApplyError::NotAutomatic);
    }
    let from = record.from_value.as_str();
    if from.is_empty() || !content.contains(from) {
        return Err(ApplyError::not_found(format!(
            "`{from}` does not occur in {}",
            record.file
        )));
    }

    match record.category {
        ChangeCategory::NamespaceMigration => {
            replace_namespace(content, from, &record.to_value, &record.file, namespaces)
        }
        ChangeCategory::ConfigurationProperty => {
            let Some(key) = record.property.as_deref() else {
                return Err(ApplyError::ambiguous("configuration change without a property key"));
            };
            replace_property(&record.file, content, key, from, &record.to_value)
        }
        other => Err(ApplyError::ambiguous(format!(
            "no automatic edit for {other} changes"
        ))),
    }
}

fn splice(content: &str, ranges: &[Range<usize>], replacement: &str) -> String {
    let mut out = String::with_capacity(content.len() + ranges.len() * replacement.len());
    let mut last = 0;
    for r in ranges {
        out.push_str(&content[last..r.start]);
        out.push_str(replacement);
        last = r.end;
    }
    out.push_str(&content[last..]);
    out
}

fn replace_namespace(
    content: &str,
    from: &str,
    to: &str,
    file: &str,
    namespaces: &NamespaceTable,
) -> Result<String, ApplyError> {
    if to.is_empty() {
        return Err(ApplyError::ambiguous("empty replacement name"));
    }
    // A target that still contains the source as a token would match again.
    if !token_occurrences(to, from).is_empty() {
        return Err(ApplyError::ambiguous(format!(
            "replacement `{to}` contains `{from}`"
        )));
    }
    let (ranges, excluded) = namespaces.partition_occurrences(content, from);
    match (ranges.is_empty(), excluded.first()) {
        (true, None) => Err(ApplyError::not_found(format!(
            "`{from}` occurs in {file} only inside longer names"
        ))),
        (true, Some(_)) => Err(ApplyError::not_found(format!(
            "`{from}` occurs in {file} only under packages that are never renamed"
        ))),
        (false, Some(r)) => Err(ApplyError::ambiguous(format!(
            "`{from}` also matches `{}` in {file}, which is never renamed",
            dotted_name_at(content, r.start)
        ))),
        (false, None) => Ok(splice(content, &ranges, to)),
    }
}

fn replace_property(
    path: &str,
    content: &str,
    key: &str,
    from: &str,
    to: &str,
) -> Result<String, ApplyError> {
    if to.contains(['\n', '\r']) {
        return Err(ApplyError::ambiguous("multi-line replacement value"));
    }
    let Some(assignments) = find_assignments(path, content) else {
        return Err(ApplyError::ambiguous(format!(
            "unsupported configuration format: {path}"
        )));
    };

    let for_key: Vec<&Assignment> = assignments.iter().filter(|a| a.key == key).collect();
    if for_key.is_empty() {
        return Err(ApplyError::not_found(format!("`{key}` is not set in {path}")));
    }
    let matching: Vec<&Assignment> = for_key
        .into_iter()
        .filter(|a| &content[a.value.clone()] == from)
        .collect();

    match matching.as_slice() {
        [] => Err(ApplyError::not_found(format!(
            "`{key}` in {path} does not have the value `{from}`"
        ))),
        [one] => {
            if !one.quoted && needs_quoting(path, to) {
                return Err(ApplyError::ambiguous(format!(
                    "value `{to}` would need quoting in {path}"
                )));
            }
            Ok(splice(content, std::slice::from_ref(&one.value), to))
        }
        many => Err(ApplyError::ambiguous(format!(
            "`{key}` is set to `{from}` {} times in {path}",
            many.len()
        ))),
    }
}

fn needs_quoting(path: &str, value: &str) -> bool {
    if file_extension(path).as_deref() == Some("properties") {
        return false;
    }
    value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.starts_with(|c: char| "{}[]&*!|>'\"%@`#,?-".contains(c) || c.is_whitespace())
}

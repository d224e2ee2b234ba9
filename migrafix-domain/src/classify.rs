//! Safety classification and content verification of proposed changes.

use crate::assignments::is_assigned;
use crate::namespaces::{NamespaceTable, dotted_name_at, strip_import};
use migrafix_types::change::{
    ChangeCategory, ChangeId, ChangeRecord, ChangeState, ProposedChange, TransitionError,
};
use migrafix_types::source::{SourceFile, file_extension, file_name};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Reason attached to records whose target text is missing from the file.
pub const TARGET_NOT_FOUND: &str = "target text not found";

const SECURITY_MARKERS: [&str; 16] = [
    "WebSecurityConfigurerAdapter",
    "SecurityFilterChain",
    "HttpSecurity",
    "WebSecurity",
    "authorizeRequests",
    "authorizeHttpRequests",
    "antMatchers",
    "mvcMatchers",
    "requestMatchers",
    "EnableGlobalMethodSecurity",
    "EnableMethodSecurity",
    "EnableWebSecurity",
    "AuthenticationManagerBuilder",
    "GlobalAuthenticationConfigurerAdapter",
    "spring-security",
    "spring.security",
];

const DEPENDENCY_FILES: [&str; 6] = [
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
    "libs.versions.toml",
];

const CONFIG_EXTENSIONS: [&str; 3] = ["properties", "yml", "yaml"];

/// Files where a namespace rename is a reference rewrite rather than a build
/// coordinate change.
const NAMESPACE_EXTENSIONS: [&str; 8] = ["java", "kt", "groovy", "scala", "jsp", "jspx", "xml", "tld"];

pub fn is_dependency_file(path: &str) -> bool {
    let name = file_name(path);
    DEPENDENCY_FILES.contains(&name) || name.ends_with(".gradle") || name.ends_with(".gradle.kts")
}

pub fn is_config_file(path: &str) -> bool {
    file_extension(path).is_some_and(|e| CONFIG_EXTENSIONS.contains(&e.as_str()))
}

fn is_namespace_target(path: &str) -> bool {
    !is_dependency_file(path)
        && file_extension(path).is_some_and(|e| NAMESPACE_EXTENSIONS.contains(&e.as_str()))
}

/// Contains a `digit.digit` run, e.g. `5.3.30` or `<version>6.1.4</version>`.
pub fn contains_version(s: &str) -> bool {
    let b = s.as_bytes();
    b.windows(3)
        .any(|w| w[0].is_ascii_digit() && w[1] == b'.' && w[2].is_ascii_digit())
}

/// Split `key=value` / `key: value` into trimmed parts.
pub fn split_property(s: &str) -> Option<(&str, &str)> {
    let idx = s.find(['=', ':'])?;
    let key = s[..idx].trim();
    let value = s[idx + 1..].trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

/// 1-based line numbers on which `needle` occurs.
pub fn locate_lines(content: &str, needle: &str) -> BTreeSet<u64> {
    if needle.is_empty() || needle.contains('\n') {
        return BTreeSet::new();
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| l.contains(needle))
        .map(|(i, _)| i as u64 + 1)
        .collect()
}

/// Change after normalization, before the policy runs.
#[derive(Debug, Clone)]
struct Draft {
    from: String,
    to: String,
    property: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeClassifier {
    namespaces: NamespaceTable,
}

impl ChangeClassifier {
    pub fn new(namespaces: NamespaceTable) -> Self {
        Self { namespaces }
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Classify one proposed change against the file it was generated for,
    /// then verify it against that file's content.
    ///
    /// `ordinal` is the change's position in the file's list and feeds the id.
    /// The returned record is `Verified` or `Downgraded`.
    pub fn classify(&self, proposed: &ProposedChange, file: &SourceFile, ordinal: usize) -> ChangeRecord {
        let (category, automatic, draft) = self.policy(proposed, &file.path);

        let description = if proposed.description.trim().is_empty() {
            format!("{category} change in {}", file.path)
        } else {
            proposed.description.trim().to_string()
        };
        let explanation = if proposed.explanation.trim().is_empty() {
            "No explanation provided.".to_string()
        } else {
            proposed.explanation.trim().to_string()
        };

        let mut notes = Vec::new();
        if proposed.automatic == Some(true) && !automatic {
            notes.push(format!(
                "model marked this change automatic; {category} changes require manual review"
            ));
        }

        let mut line_numbers = locate_lines(&file.content, &draft.from);
        if line_numbers.is_empty() {
            line_numbers = proposed.line_numbers.iter().copied().filter(|n| *n > 0).collect();
        }

        let mut record = ChangeRecord {
            id: ChangeId::derive(&file.path, category, &draft.from, &draft.to, ordinal),
            file: file.path.clone(),
            category,
            kind: proposed.kind.trim().to_string(),
            from_value: draft.from,
            to_value: draft.to,
            property: draft.property,
            description,
            explanation,
            line_numbers,
            automatic,
            notes,
            state: ChangeState::Proposed,
            history: vec![ChangeState::Proposed],
        };
        let steps = record
            .advance(ChangeState::Classified)
            .and_then(|()| self.verify(&mut record, &file.content));
        if let Err(e) = steps {
            warn!(file = %record.file, error = %e, "classification stopped early");
        }
        record
    }

    /// Content verification. An automatic record is downgraded with a note
    /// when its target is missing from `content` or, for a namespace rename,
    /// when it also matches a package that is never renamed. Manual records
    /// pass through.
    fn verify(&self, record: &mut ChangeRecord, content: &str) -> Result<(), TransitionError> {
        let problem = if record.automatic {
            self.verification_problem(record, content)
        } else {
            None
        };
        match problem {
            Some(note) => {
                warn!(file = %record.file, change = %record.id.short(), "{note}");
                record.downgrade(note)
            }
            None => {
                debug!(
                    file = %record.file,
                    change = %record.id.short(),
                    category = %record.category,
                    automatic = record.automatic,
                    "change verified"
                );
                record.advance(ChangeState::Verified)
            }
        }
    }

    fn verification_problem(&self, record: &ChangeRecord, content: &str) -> Option<String> {
        let from = record.from_value.as_str();
        let missing = |what: String| {
            Some(format!(
                "{TARGET_NOT_FOUND}: {what} in {}; downgraded to manual review",
                record.file
            ))
        };
        if from.is_empty() || !content.contains(from) {
            return missing(format!("`{from}` does not occur"));
        }
        match (record.category, record.property.as_deref()) {
            (ChangeCategory::ConfigurationProperty, Some(key))
                if !is_assigned(&record.file, content, key, from) =>
            {
                missing(format!("`{key}` is not set to `{from}`"))
            }
            (ChangeCategory::NamespaceMigration, _) => {
                let (_, excluded) = self.namespaces.partition_occurrences(content, from);
                excluded.first().map(|r| {
                    format!(
                        "`{from}` also matches `{}`, which is never renamed; downgraded to manual review",
                        dotted_name_at(content, r.start)
                    )
                })
            }
            _ => None,
        }
    }

    fn policy(&self, p: &ProposedChange, path: &str) -> (ChangeCategory, bool, Draft) {
        let raw = Draft {
            from: p.from.trim().to_string(),
            to: p.to.trim().to_string(),
            property: p
                .property
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        };

        // 1. Namespace rename of an import or qualified reference.
        let ns_from = strip_import(&raw.from);
        let ns_to = strip_import(&raw.to);
        if is_namespace_target(path) && self.namespaces.is_rename(ns_from, ns_to) {
            let draft = Draft {
                from: ns_from.to_string(),
                to: ns_to.to_string(),
                property: None,
            };
            return (ChangeCategory::NamespaceMigration, true, draft);
        }

        // 2. Security configuration: structural, never automatic.
        let haystacks = [&raw.from, &raw.to, &p.kind, &p.description];
        if p.bucket == ChangeCategory::SecurityConfig.bucket()
            || haystacks
                .iter()
                .any(|h| SECURITY_MARKERS.iter().any(|m| h.contains(m)))
        {
            return (ChangeCategory::SecurityConfig, false, raw);
        }

        // 3. Version bump in a build file.
        if is_dependency_file(path)
            && raw.from != raw.to
            && contains_version(&raw.from)
            && contains_version(&raw.to)
        {
            return (ChangeCategory::DependencyVersion, false, raw);
        }

        // 4. Single property value replacement.
        if is_config_file(path) {
            if let Some(draft) = property_draft(&raw) {
                return (ChangeCategory::ConfigurationProperty, true, draft);
            }
        }

        // 5. Everything else.
        if is_dependency_file(path) && p.bucket == ChangeCategory::DependencyVersion.bucket() {
            return (ChangeCategory::DependencyVersion, false, raw);
        }
        (ChangeCategory::Other, false, raw)
    }
}

fn single_line(s: &str) -> bool {
    !s.contains('\n') && !s.contains('\r')
}

fn property_draft(raw: &Draft) -> Option<Draft> {
    if !single_line(&raw.from) || !single_line(&raw.to) {
        return None;
    }
    if let Some(key) = &raw.property {
        if key.contains(char::is_whitespace) || raw.from.is_empty() || raw.to.is_empty() {
            return None;
        }
        // Values may arrive as full `key=value` lines.
        let (from, to) = match (split_property(&raw.from), split_property(&raw.to)) {
            (Some((k1, v1)), Some((k2, v2))) if k1 == key && k2 == key => {
                (v1.to_string(), v2.to_string())
            }
            _ => (raw.from.clone(), raw.to.clone()),
        };
        return (!from.is_empty() && !to.is_empty() && from != to).then(|| Draft {
            from,
            to,
            property: Some(key.clone()),
        });
    }

    let (k1, v1) = split_property(&raw.from)?;
    let (k2, v2) = split_property(&raw.to)?;
    (k1 == k2 && !v1.is_empty() && !v2.is_empty() && v1 != v2).then(|| Draft {
        from: v1.to_string(),
        to: v2.to_string(),
        property: Some(k1.to_string()),
    })
}

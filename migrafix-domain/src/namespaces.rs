//! Namespace mapping table (`javax.*` → `jakarta.*`).

use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMapping {
    pub from: String,
    pub to: String,
}

/// Jakarta EE 9 package renames. `javax.annotation.processing` and other
/// JDK-owned packages stay under `javax`.
const BUILTIN: [(&str, &str); 18] = [
    ("javax.activation", "jakarta.activation"),
    ("javax.annotation", "jakarta.annotation"),
    ("javax.batch", "jakarta.batch"),
    ("javax.ejb", "jakarta.ejb"),
    ("javax.el", "jakarta.el"),
    ("javax.enterprise", "jakarta.enterprise"),
    ("javax.faces", "jakarta.faces"),
    ("javax.inject", "jakarta.inject"),
    ("javax.jms", "jakarta.jms"),
    ("javax.json", "jakarta.json"),
    ("javax.mail", "jakarta.mail"),
    ("javax.persistence", "jakarta.persistence"),
    ("javax.servlet", "jakarta.servlet"),
    ("javax.transaction", "jakarta.transaction"),
    ("javax.validation", "jakarta.validation"),
    ("javax.websocket", "jakarta.websocket"),
    ("javax.ws.rs", "jakarta.ws.rs"),
    ("javax.xml.bind", "jakarta.xml.bind"),
];

const BUILTIN_EXCLUSIONS: [&str; 2] = ["javax.annotation.processing", "javax.transaction.xa"];

/// Ordered old-prefix → new-prefix table. Longest prefix wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    mappings: Vec<NamespaceMapping>,
    exclusions: Vec<String>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        let mut t = Self {
            mappings: Vec::new(),
            exclusions: BUILTIN_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
        };
        for (from, to) in BUILTIN {
            t = t.with_mapping(from, to);
        }
        t
    }
}

impl NamespaceTable {
    pub fn empty() -> Self {
        Self {
            mappings: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    /// Add or replace the mapping for `from`.
    pub fn with_mapping(mut self, from: &str, to: &str) -> Self {
        self.mappings.retain(|m| m.from != from);
        self.mappings.push(NamespaceMapping {
            from: from.to_string(),
            to: to.to_string(),
        });
        self.mappings
            .sort_by(|a, b| b.from.len().cmp(&a.from.len()).then(a.from.cmp(&b.from)));
        self
    }

    pub fn with_exclusion(mut self, prefix: &str) -> Self {
        if !self.exclusions.iter().any(|e| e == prefix) {
            self.exclusions.push(prefix.to_string());
        }
        self
    }

    pub fn mappings(&self) -> &[NamespaceMapping] {
        &self.mappings
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Whether `name` lies under a package that is never renamed.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusions.iter().any(|e| has_token_prefix(name, e))
    }

    /// Whole-token occurrences of `from` in `content`, split into those that
    /// may be renamed and those whose full dotted name is excluded.
    pub fn partition_occurrences(
        &self,
        content: &str,
        from: &str,
    ) -> (Vec<Range<usize>>, Vec<Range<usize>>) {
        token_occurrences(content, from)
            .into_iter()
            .partition(|r| !self.is_excluded(dotted_name_at(content, r.start)))
    }

    /// `name` with its mapped prefix replaced, if any mapping applies.
    pub fn rewrite(&self, name: &str) -> Option<String> {
        if self.is_excluded(name) {
            return None;
        }
        self.mappings
            .iter()
            .find(|m| has_token_prefix(name, &m.from))
            .map(|m| format!("{}{}", m.to, &name[m.from.len()..]))
    }

    /// Whether `from` → `to` is exactly one table rename of a qualified name.
    pub fn is_rename(&self, from: &str, to: &str) -> bool {
        is_qualified_name(from) && self.rewrite(from).as_deref() == Some(to)
    }
}

/// `name` equals `prefix` or continues it with a `.` segment.
pub fn has_token_prefix(name: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && name.starts_with(prefix)
        && matches!(name.as_bytes().get(prefix.len()), None | Some(b'.'))
}

/// Byte ranges of whole-token occurrences of `name` in `text`.
///
/// An occurrence counts only when it is not preceded by an identifier
/// character or `.` and not followed by an identifier character. A following
/// `.` is allowed so `javax.persistence` matches inside
/// `javax.persistence.Entity`.
pub fn token_occurrences(text: &str, name: &str) -> Vec<Range<usize>> {
    if name.is_empty() {
        return Vec::new();
    }
    text.match_indices(name)
        .filter(|(start, _)| {
            let end = start + name.len();
            let before_ok = text[..*start]
                .chars()
                .next_back()
                .is_none_or(|c| !is_identifier_char(c) && c != '.');
            let after_ok = text[end..].chars().next().is_none_or(|c| !is_identifier_char(c));
            before_ok && after_ok
        })
        .map(|(start, _)| start..start + name.len())
        .collect()
}

/// The dotted name starting at byte `start` of `text`, without a trailing `.`
/// (so `javax.a.*` yields `javax.a`).
pub fn dotted_name_at(text: &str, start: usize) -> &str {
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !is_identifier_char(c) && c != '.')
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.')
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Dotted Java-style name with at least two segments.
pub fn is_qualified_name(s: &str) -> bool {
    let mut segments = 0;
    for seg in s.split('.') {
        let mut chars = seg.chars();
        match chars.next() {
            Some(c) if (c.is_alphabetic() || c == '_' || c == '$') => {}
            _ => return false,
        }
        if !chars.all(is_identifier_char) {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}

/// Strip `import`/`import static`, a trailing `;` and a trailing `.*` so an
/// import statement reduces to the name it references.
pub fn strip_import(s: &str) -> &str {
    let mut t = s.trim();
    for kw in ["import static ", "import "] {
        if let Some(rest) = t.strip_prefix(kw) {
            t = rest.trim_start();
            break;
        }
    }
    t = t.strip_suffix(';').unwrap_or(t).trim_end();
    t.strip_suffix(".*").unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_whole_token_prefixes_only() {
        let t = NamespaceTable::default();
        assert_eq!(
            t.rewrite("javax.persistence.Entity").as_deref(),
            Some("jakarta.persistence.Entity")
        );
        assert_eq!(t.rewrite("javax.persistence").as_deref(), Some("jakarta.persistence"));
        assert_eq!(t.rewrite("javax.persistencex.Foo"), None);
        assert_eq!(t.rewrite("javax.sql.DataSource"), None);
    }

    #[test]
    fn exclusions_win() {
        let t = NamespaceTable::default();
        assert_eq!(t.rewrite("javax.annotation.processing.Processor"), None);
        assert_eq!(
            t.rewrite("javax.annotation.PostConstruct").as_deref(),
            Some("jakarta.annotation.PostConstruct")
        );
    }

    #[test]
    fn token_occurrences_allows_trailing_dot() {
        let t = "javax.a.B javax.ab javax.a";
        assert_eq!(token_occurrences(t, "javax.a"), vec![0..7, 19..26]);
    }

    #[test]
    fn dotted_name_stops_at_punctuation() {
        assert_eq!(dotted_name_at("import javax.a.*;", 7), "javax.a");
        assert_eq!(dotted_name_at("@javax.a.B(x)", 1), "javax.a.B");
    }

    #[test]
    fn occurrences_under_excluded_packages_are_separated() {
        let t = NamespaceTable::default();
        let src = "import javax.annotation.*;\nimport javax.annotation.processing.Processor;\n";
        let (renamable, excluded) = t.partition_occurrences(src, "javax.annotation");
        assert_eq!(renamable, vec![7..23]);
        assert_eq!(excluded.len(), 1);
        assert_eq!(dotted_name_at(src, excluded[0].start), "javax.annotation.processing.Processor");
    }

    #[test]
    fn longest_prefix_wins() {
        let t = NamespaceTable::empty()
            .with_mapping("javax.xml", "legacy.xml")
            .with_mapping("javax.xml.bind", "jakarta.xml.bind");
        assert_eq!(
            t.rewrite("javax.xml.bind.JAXB").as_deref(),
            Some("jakarta.xml.bind.JAXB")
        );
        assert_eq!(t.rewrite("javax.xml.Foo").as_deref(), Some("legacy.xml.Foo"));
    }

    #[test]
    fn rename_requires_exact_target() {
        let t = NamespaceTable::default();
        assert!(t.is_rename("javax.servlet.Filter", "jakarta.servlet.Filter"));
        assert!(!t.is_rename("javax.servlet.Filter", "jakarta.servlet.http.Filter"));
        assert!(!t.is_rename("javax servlet", "jakarta servlet"));
    }

    #[test]
    fn strip_import_forms() {
        assert_eq!(strip_import("import javax.persistence.Entity;"), "javax.persistence.Entity");
        assert_eq!(
            strip_import("import static javax.persistence.GenerationType.IDENTITY;"),
            "javax.persistence.GenerationType.IDENTITY"
        );
        assert_eq!(strip_import("import javax.persistence.*;"), "javax.persistence");
        assert_eq!(strip_import("  javax.validation "), "javax.validation");
    }

    #[test]
    fn qualified_names() {
        assert!(is_qualified_name("javax.persistence"));
        assert!(is_qualified_name("com.acme.$Inner_1"));
        assert!(!is_qualified_name("javax"));
        assert!(!is_qualified_name("javax..persistence"));
        assert!(!is_qualified_name("1javax.persistence"));
        assert!(!is_qualified_name(""));
    }
}

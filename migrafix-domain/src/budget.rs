//! Prompt-size budgeting for file content.
//!
//! Lengths are UTF-8 byte lengths; cuts always land on char boundaries.

use migrafix_types::source::file_extension;
use std::borrow::Cow;

const CODE_EXTENSIONS: [&str; 4] = ["java", "kt", "groovy", "scala"];

const HEADER_PREFIXES: [&str; 6] = ["package ", "import ", "//", "/*", "*", "@"];

const DECLARATION_KEYWORDS: [&str; 5] = ["class ", "interface ", "enum ", "record ", "@interface "];

const MODIFIERS: [&str; 8] = [
    "public ",
    "protected ",
    "private ",
    "abstract ",
    "final ",
    "static ",
    "sealed ",
    "open ",
];

/// Marker appended to truncated content.
pub fn truncation_marker(original_len: usize) -> String {
    format!("\n... [File truncated - original length: {original_len} bytes] ...")
}

/// Truncates file content to fit a prompt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBudgeter {
    pub limit: usize,
}

impl ContentBudgeter {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Content of `path` cut to at most `self.limit` bytes.
    ///
    /// Unchanged when it already fits. Source files keep their
    /// package/import/declaration header first, then as many following lines
    /// as fit; other files keep a plain prefix. A marker follows the cut
    /// whenever the limit leaves room for it. Pure and deterministic.
    pub fn budget<'a>(&self, path: &str, content: &'a str) -> Cow<'a, str> {
        if content.len() <= self.limit {
            return Cow::Borrowed(content);
        }

        let marker = truncation_marker(content.len());
        if marker.len() >= self.limit {
            return Cow::Borrowed(prefix(content, self.limit));
        }

        let room = self.limit - marker.len();
        let mut body = if is_code_path(path) {
            code_body(content, room)
        } else {
            prefix(content, room).to_string()
        };
        body.push_str(&marker);
        Cow::Owned(body)
    }
}

pub fn is_code_path(path: &str) -> bool {
    file_extension(path).is_some_and(|e| CODE_EXTENSIONS.contains(&e.as_str()))
}

/// Longest prefix of `s` no longer than `max` bytes.
pub fn prefix(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn is_declaration(trimmed: &str) -> bool {
    let mut rest = trimmed;
    loop {
        match MODIFIERS.iter().find(|m| rest.starts_with(*m)) {
            Some(m) => rest = &rest[m.len()..],
            None => break,
        }
    }
    DECLARATION_KEYWORDS.iter().any(|k| rest.starts_with(k))
}

fn is_header(trimmed: &str) -> bool {
    trimmed.is_empty() || HEADER_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Number of leading lines that form the declaration header, up to and
/// including the first type declaration.
fn header_len(lines: &[&str]) -> usize {
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if is_declaration(trimmed) {
            return i + 1;
        }
        if !is_header(trimmed) {
            return i;
        }
    }
    lines.len()
}

fn is_structural(trimmed: &str) -> bool {
    trimmed.starts_with("package ")
        || trimmed.starts_with("import ")
        || trimmed.starts_with('@')
        || is_declaration(trimmed)
}

/// Push lines in order until one does not fit.
fn fill<'l>(out: &mut String, lines: impl Iterator<Item = &'l str>, room: usize) {
    for line in lines {
        if out.len() + line.len() > room {
            if out.is_empty() {
                out.push_str(prefix(line, room));
            }
            return;
        }
        out.push_str(line);
    }
}

fn code_body(content: &str, room: usize) -> String {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let header = header_len(&lines);
    let header_bytes: usize = lines[..header].iter().map(|l| l.len()).sum();
    let mut out = String::with_capacity(room);

    if header_bytes <= room {
        fill(&mut out, lines.iter().copied(), room);
    } else {
        // Header alone is too big (long license blocks): keep its structural
        // lines and drop comments and blank lines.
        let structural = lines[..header]
            .iter()
            .copied()
            .filter(|l| is_structural(l.trim_start()));
        fill(&mut out, structural, room);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const JAVA: &str = "package com.acme;\n\nimport javax.persistence.Entity;\nimport javax.persistence.Id;\n\n@Entity\npublic class User {\n    @Id\n    private Long id;\n\n    public Long getId() {\n        return id;\n    }\n}\n";

    #[test]
    fn fitting_content_is_borrowed_unchanged() {
        let b = ContentBudgeter::new(JAVA.len());
        assert!(matches!(b.budget("User.java", JAVA), Cow::Borrowed(s) if s == JAVA));
    }

    #[test]
    fn one_byte_over_is_truncated_within_limit() {
        let limit = JAVA.len() - 1;
        let out = ContentBudgeter::new(limit).budget("User.java", JAVA);
        assert!(out.len() <= limit);
        assert!(out.contains("File truncated"));
    }

    #[test]
    fn java_header_is_kept_before_body() {
        let marker = truncation_marker(JAVA.len());
        let header = "package com.acme;\n\nimport javax.persistence.Entity;\nimport javax.persistence.Id;\n\n@Entity\npublic class User {\n";
        let out = ContentBudgeter::new(header.len() + marker.len() + 3).budget("User.java", JAVA);
        assert_eq!(out, format!("{header}{marker}"));
    }

    #[test]
    fn header_detection_stops_at_declaration() {
        let lines: Vec<&str> = JAVA.split_inclusive('\n').collect();
        assert_eq!(header_len(&lines), 7);
        assert!(is_declaration("public abstract class Base<T> {"));
        assert!(is_declaration("interface Repo {"));
        assert!(!is_declaration("public void run() {"));
    }

    #[test]
    fn oversized_header_drops_comments_first() {
        let license = "// Licensed under the Apache License\n".repeat(20);
        let content = format!("{license}package com.acme;\nimport javax.servlet.Filter;\npublic class F {{\n}}\n");
        let marker = truncation_marker(content.len());
        let out = ContentBudgeter::new(marker.len() + 70).budget("F.java", &content);
        assert_eq!(
            out,
            format!("package com.acme;\nimport javax.servlet.Filter;\npublic class F {{\n{marker}")
        );
    }

    #[test]
    fn non_code_keeps_plain_prefix() {
        let content = "a=1\n".repeat(100);
        let out = ContentBudgeter::new(120).budget("app.properties", &content);
        let marker = truncation_marker(content.len());
        assert_eq!(out.len(), 120);
        assert!(out.ends_with(&marker));
        assert!(content.starts_with(&out[..120 - marker.len()]));
    }

    #[test]
    fn tiny_limit_still_respected() {
        let out = ContentBudgeter::new(5).budget("User.java", JAVA);
        assert_eq!(out, "packa");
    }

    #[test]
    fn multibyte_content_is_cut_on_boundaries() {
        let content = "é".repeat(200);
        let out = ContentBudgeter::new(101).budget("notes.txt", &content);
        assert!(out.len() <= 101);
    }
}

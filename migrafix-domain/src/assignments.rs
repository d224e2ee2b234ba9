//! `key = value` lookup in `.properties` and block-style YAML files.

use migrafix_types::source::file_extension;
use std::ops::Range;

/// Location of one scalar assignment's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Dotted key; nested YAML mappings are joined with `.`.
    pub key: String,
    /// Byte range of the value in the file, inside any quotes.
    pub value: Range<usize>,
    pub quoted: bool,
}

/// Every scalar assignment in `content`, or `None` when `path` is not a
/// `.properties`, `.yml` or `.yaml` file.
pub fn find_assignments(path: &str, content: &str) -> Option<Vec<Assignment>> {
    match file_extension(path).as_deref() {
        Some("properties") => Some(properties_assignments(content)),
        Some("yml" | "yaml") => Some(yaml_assignments(content)),
        _ => None,
    }
}

/// Whether `key` is assigned exactly `value` somewhere in `content`.
///
/// Formats without an assignment parser fall back to a plain substring check
/// of the value.
pub fn is_assigned(path: &str, content: &str, key: &str, value: &str) -> bool {
    match find_assignments(path, content) {
        Some(all) => all
            .iter()
            .any(|a| a.key == key && content[a.value.clone()] == *value),
        None => !value.is_empty() && content.contains(value),
    }
}

/// Lines of `content` with their starting byte offsets, line endings excluded.
fn lines_with_offsets(content: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    content.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        (start, line.strip_suffix('\r').unwrap_or(line))
    })
}

fn trim_end_range(line: &str, range: Range<usize>) -> Range<usize> {
    let trimmed = line[range.clone()].trim_end();
    range.start..range.start + trimmed.len()
}

/// Strip matching quotes. Returns the inner range and whether quotes were found.
fn unquote(line: &str, range: Range<usize>) -> (Range<usize>, bool) {
    let text = &line[range.clone()];
    for q in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(q) && text.ends_with(q) {
            return (range.start + 1..range.end - 1, true);
        }
    }
    (range, false)
}

fn properties_assignments(content: &str) -> Vec<Assignment> {
    let mut out = Vec::new();
    let mut continued = false;
    for (offset, line) in lines_with_offsets(content) {
        let was_continued = continued;
        continued = line.ends_with('\\');
        if was_continued {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        let body = &line[indent..];
        if body.is_empty() || body.starts_with('#') || body.starts_with('!') {
            continue;
        }
        let key_len = body
            .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
            .unwrap_or(body.len());
        let key = &body[..key_len];

        let mut pos = indent + key_len;
        pos += line[pos..].len() - line[pos..].trim_start().len();
        if line[pos..].starts_with(['=', ':']) {
            pos += 1;
            pos += line[pos..].len() - line[pos..].trim_start().len();
        }
        let (value, quoted) = unquote(line, trim_end_range(line, pos..line.len()));
        out.push(Assignment {
            key: key.to_string(),
            value: offset + value.start..offset + value.end,
            quoted,
        });
    }
    out
}

/// End of the scalar in `line[start..]` before any ` #` comment outside quotes.
fn yaml_scalar_end(line: &str, start: usize) -> usize {
    let rest = &line[start..];
    let mut quote: Option<char> = None;
    let mut prev_space = true;
    for (i, c) in rest.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if (c == '"' || c == '\'') && i == 0 => quote = Some(c),
            None if c == '#' && prev_space => return start + i,
            None => {}
        }
        prev_space = c.is_whitespace();
    }
    line.len()
}

fn yaml_key(raw: &str) -> &str {
    let k = raw.trim();
    for q in ['"', '\''] {
        if k.len() >= 2 && k.starts_with(q) && k.ends_with(q) {
            return &k[1..k.len() - 1];
        }
    }
    k
}

/// Scalar assignments in block-style YAML, keyed by their dotted path.
///
/// Document separators reset the path, so a key set in several profile
/// documents appears once per document.
fn yaml_assignments(content: &str) -> Vec<Assignment> {
    let mut out = Vec::new();
    let mut stack: Vec<(usize, String)> = Vec::new();

    for (offset, line) in lines_with_offsets(content) {
        let trimmed = line.trim_start();
        if trimmed == "---" || trimmed.starts_with("--- ") {
            stack.clear();
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('-') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        let Some(colon) = find_mapping_colon(trimmed) else {
            continue;
        };
        let key = yaml_key(&trimmed[..colon]);
        while stack.last().is_some_and(|(i, _)| *i >= indent) {
            stack.pop();
        }
        let full = stack
            .iter()
            .map(|(_, k)| k.as_str())
            .chain(std::iter::once(key))
            .collect::<Vec<_>>()
            .join(".");

        let mut pos = indent + colon + 1;
        pos += line[pos..].len() - line[pos..].trim_start().len();
        let end = yaml_scalar_end(line, pos);
        let value = trim_end_range(line, pos..end);
        if value.is_empty() {
            stack.push((indent, key.to_string()));
            continue;
        }
        let (value, quoted) = unquote(line, value);
        out.push(Assignment {
            key: full,
            value: offset + value.start..offset + value.end,
            quoted,
        });
    }
    out
}

/// Byte index of the `:` that ends a mapping key, skipping quoted keys.
fn find_mapping_colon(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if (c == '"' || c == '\'') && i == 0 => quote = Some(c),
            None if c == ':' => {
                let next = s[i + 1..].chars().next();
                if next.is_none_or(char::is_whitespace) {
                    return Some(i);
                }
            }
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys_and_values(path: &str, content: &str) -> Vec<(String, String)> {
        find_assignments(path, content)
            .unwrap()
            .into_iter()
            .map(|a| (a.key, content[a.value].to_string()))
            .collect()
    }

    #[test]
    fn properties_separators_comments_and_continuations() {
        let src = "# c\n! c\na=1\nb : two\nc three\nd=long\\\n  tail\ne = \"q\"\n";
        assert_eq!(
            keys_and_values("app.properties", src),
            vec![
                ("a".into(), "1".into()),
                ("b".into(), "two".into()),
                ("c".into(), "three".into()),
                ("d".into(), "long\\".into()),
                ("e".into(), "q".into()),
            ]
        );
    }

    #[test]
    fn yaml_nesting_resets_per_document() {
        let src = "server:\n  port: 8080 # main\n  servlet:\n    path: '/api'\nother: x\n---\nport: 1\n";
        assert_eq!(
            keys_and_values("application.yml", src),
            vec![
                ("server.port".into(), "8080".into()),
                ("server.servlet.path".into(), "/api".into()),
                ("other".into(), "x".into()),
                ("port".into(), "1".into()),
            ]
        );
    }

    #[test]
    fn unsupported_format_has_no_parser() {
        assert_eq!(find_assignments("settings.xml", "<a>1</a>"), None);
    }

    #[test]
    fn is_assigned_requires_key_and_value() {
        let src = "server.port=8080\n";
        assert!(is_assigned("application.properties", src, "server.port", "8080"));
        assert!(!is_assigned("application.properties", src, "management.port", "8080"));
        assert!(!is_assigned("application.properties", src, "server.port", "80"));
    }
}

//! Locating the structured payload inside free-form model output.

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Slice of `raw` that most likely holds the JSON payload.
///
/// Search starts after the first ```` ```json ```` marker (or any fence) and
/// stops at the closing fence. Without a marker the first `{`/`[` anywhere is
/// used. Returns an empty slice when there is no opener at all.
pub fn isolate_payload(raw: &str) -> &str {
    if let Some(after) = marker_end(raw) {
        let rest = &raw[after..];
        let region = match rest.find(FENCE) {
            Some(close) => &rest[..close],
            None => rest,
        };
        if let Some(open) = region.find(['{', '[']) {
            return region[open..].trim_end();
        }
    }

    match raw.find(['{', '[']) {
        Some(open) => raw[open..].trim_end(),
        None => "",
    }
}

fn marker_end(raw: &str) -> Option<usize> {
    let lower = raw.to_ascii_lowercase();
    if let Some(i) = lower.find(JSON_FENCE) {
        return Some(i + JSON_FENCE.len());
    }
    raw.find(FENCE).map(|i| i + FENCE.len())
}

/// Byte offsets of commas that sit outside string literals.
pub(crate) fn structural_commas(text: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ',' => out.push(i),
            _ => {}
        }
    }
    out
}

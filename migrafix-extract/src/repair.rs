//! Best-effort repair of truncated or sloppy JSON.
//!
//! The pass is string-aware: brackets and commas inside string literals are
//! copied through untouched.

/// Balance brackets, drop trailing commas before closers, close an open
/// string and cut anything after the top-level value ends.
pub fn repair(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut opened = false;

    for ch in text.chars() {
        if in_string {
            out.push(ch);
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
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '{' => {
                stack.push('}');
                opened = true;
                out.push(ch);
            }
            '[' => {
                stack.push(']');
                opened = true;
                out.push(ch);
            }
            '}' | ']' => {
                // Stray closers with no matching opener are dropped.
                if !stack.contains(&ch) {
                    continue;
                }
                while let Some(top) = stack.pop() {
                    close_value(&mut out);
                    out.push(top);
                    if top == ch {
                        break;
                    }
                }
                if opened && stack.is_empty() {
                    return out;
                }
            }
            _ => out.push(ch),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(top) = stack.pop() {
        close_value(&mut out);
        out.push(top);
    }
    out
}

/// Prepare `out` for a closer: trim whitespace and trailing commas, and give
/// a dangling `"key":` a null value.
fn close_value(out: &mut String) {
    loop {
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        if out.ends_with(',') {
            out.pop();
            continue;
        }
        break;
    }
    if out.ends_with(':') {
        out.push_str("null");
    }
}

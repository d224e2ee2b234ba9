use diffy::PatchFormatter;
use std::collections::BTreeMap;

/// Unified diff over every file whose content changed between `before` and
/// `after`, in path order.
pub fn render_patch(before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(old, new);
        let body = formatter.fmt_patch(&patch).to_string();
        // diffy repeats the ---/+++ header; keep ours.
        let hunks = body.find("\n@@").map_or(body.as_str(), |i| &body[i + 1..]);
        out.push_str(hunks);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

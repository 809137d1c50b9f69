//! Token protection and output sanitization around the rewrite call.
//!
//! The model must not be able to mangle merge tokens or smuggle in a
//! second signature block; both are enforced here rather than trusted
//! to the prompt.

use std::sync::LazyLock;

use coldreach_merge::tokens::MergeToken;
use coldreach_merge::signature::strip_signature;
use regex::Regex;

/// Replace every merge token with an opaque placeholder before the text
/// goes to the model. Returns the protected text and the restore map.
pub fn protect_tokens(text: &str) -> (String, Vec<(String, String)>) {
    let mut protected = text.to_string();
    let mut map = Vec::new();
    for (i, token) in MergeToken::ALL.iter().enumerate() {
        let literal = token.literal();
        if protected.contains(literal) {
            let placeholder = format!("<<<TOKEN_{i}>>>");
            protected = protected.replace(literal, &placeholder);
            map.push((literal.to_string(), placeholder));
        }
    }
    (protected, map)
}

/// Swap placeholders back to their merge tokens.
pub fn restore_tokens(text: &str, map: &[(String, String)]) -> String {
    let mut out = text.to_string();
    for (literal, placeholder) in map {
        out = out.replace(placeholder, literal);
    }
    out
}

static CODE_FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:html)?").expect("fence regex"));
static DOC_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:html|body|head)[^>]*>").expect("doc tag regex"));

/// Clean model output down to a usable HTML fragment: drop code fences,
/// document-level tags, and any signature table the model echoed back
/// (the merge engine re-injects the real one at send time).
pub fn sanitize_html(html: &str) -> String {
    let mut out = html.trim().to_string();

    out = CODE_FENCE_OPEN_RE.replace(&out, "").into_owned();
    out = strip_trailing_fence(&out).to_string();

    out = DOC_TAG_RE.replace_all(&out, "").into_owned();
    out = strip_signature(&out);

    out.trim().to_string()
}

fn strip_trailing_fence(s: &str) -> &str {
    let trimmed = s.trim_end();
    trimmed.strip_suffix("```").map(str::trim_end).unwrap_or(trimmed)
}

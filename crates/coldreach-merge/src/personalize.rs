//! Template personalization — token substitution plus signature splice.

use std::sync::LazyLock;

use coldreach_core::types::{Contact, EmailTemplate, SenderProfile};
use regex::{NoExpand, Regex};

use crate::signature::{build_signature, has_signature, strip_signature};
use crate::tokens::MergeToken;

/// Result of personalizing a template for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Personalized {
    pub subject: String,
    pub body: String,
}

/// Case-insensitive matchers for every substitutable token.
static TOKEN_PATTERNS: LazyLock<Vec<(MergeToken, Regex)>> = LazyLock::new(|| {
    MergeToken::ALL
        .iter()
        .filter(|t| **t != MergeToken::Footer)
        .map(|t| {
            let re = Regex::new(&format!("(?i){}", regex::escape(t.literal())))
                .expect("token regex");
            (*t, re)
        })
        .collect()
});

static FOOTER_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[Footer\]").expect("footer token regex"));

/// Trailing `<br>` runs and empty paragraphs before an injection point.
static TRAILING_BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:\s|<br\s*/?>|<p>(?:\s|&nbsp;)*</p>)+$").expect("trailing breaks regex")
});

/// Personalize a template for one recipient.
///
/// Token substitution is global and case-insensitive; the signature
/// block replaces `[Footer]` (or is appended when the token is absent),
/// with any pre-existing signature stripped first so the operation is
/// idempotent. The subject gains a `" | <SenderName>"` suffix exactly
/// once. Pure function — no IO, no clock.
pub fn personalize(
    template: &EmailTemplate,
    contact: &Contact,
    profile: &SenderProfile,
) -> Personalized {
    let subject = personalize_subject(&template.subject, contact, profile);
    let body = personalize_body(&template.body, contact, profile);
    Personalized { subject, body }
}

fn personalize_subject(subject: &str, contact: &Contact, profile: &SenderProfile) -> String {
    let mut subject = apply_tokens(subject, contact, profile);

    // Sender suffix, never doubled on re-personalization.
    if !profile.name.is_empty() {
        let suffix = format!(" | {}", profile.name);
        if !subject.contains(&suffix) {
            subject.push_str(&suffix);
        }
    }
    subject
}

fn personalize_body(body: &str, contact: &Contact, profile: &SenderProfile) -> String {
    let mut body = apply_tokens(body, contact, profile);

    // Strip any signature already present so repeated personalization of
    // an edited body keeps the count at exactly one.
    if has_signature(&body) {
        body = strip_signature(&body);
    }

    let signature = build_signature(profile);
    let footer_span = FOOTER_TOKEN_RE.find(&body).map(|m| (m.start(), m.end()));
    match footer_span {
        Some((start, end)) => {
            let before = TRAILING_BREAKS_RE.replace(&body[..start], "").into_owned();
            let after = body[end..].to_string();
            body = format!("{before}{signature}{after}");
            // Stray extra [Footer] tokens must not leak into sent mail.
            body = FOOTER_TOKEN_RE.replace_all(&body, "").into_owned();
        }
        None => {
            let trimmed = TRAILING_BREAKS_RE.replace(&body, "").into_owned();
            body = format!("{trimmed}{signature}");
        }
    }
    body
}

/// Run the full token table over a piece of text.
fn apply_tokens(text: &str, contact: &Contact, profile: &SenderProfile) -> String {
    let mut out = text.to_string();
    for (token, re) in TOKEN_PATTERNS.iter() {
        if re.is_match(&out) {
            let value = token.resolve(contact, profile);
            out = re.replace_all(&out, NoExpand(&value)).into_owned();
        }
    }
    out
}

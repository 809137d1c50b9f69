//! Signature block synthesis and detection.
//!
//! The block is a fixed table layout keyed by the structural marker
//! `id="email-signature"` — detection and stripping go through that
//! marker, so an edited or re-personalized body is always recognized.

use std::sync::LazyLock;

use coldreach_core::types::SenderProfile;
use regex::Regex;

/// Structural marker identifying an injected signature block.
pub const SIGNATURE_MARKER: &str = r#"id="email-signature""#;

/// Fallback avatar when the profile has no photo.
const PHOTO_PLACEHOLDER: &str = "https://placehold.co/70x70/1f2937/9ca3af?text=";

const SIGNATURE_TEMPLATE: &str = r#"
  <br><br>
  <table id="email-signature" role="presentation" cellpadding="0" cellspacing="0" border="0" style="width:100%;max-width:450px;border-top:1px solid #dddddd;padding-top:15px;margin-top:20px;">
    <tr>
      <td style="width:80px;vertical-align:top;padding-right:15px;">
        <img src="{photo}" alt="Profile" width="70" height="70" style="display:block;width:70px;height:70px;border-radius:50%;object-fit:cover;">
      </td>
      <td style="vertical-align:top;font-family:Arial,sans-serif;font-size:14px;line-height:1.4;color:#555;">
        <p style="margin:0;font-weight:bold;font-size:16px;color:#333;">{name}</p>
        <p style="margin:2px 0 6px;font-size:14px;color:#555;">{profession}</p>
        <p style="margin:2px 0;font-size:14px;color:#555;">{phone} &nbsp;&bull;&nbsp; <a href="mailto:{email}" style="color:#1a0dab;text-decoration:none;">{email}</a></p>
        <p style="margin:2px 0 8px;font-size:14px;color:#555;"><a href="{website}" style="color:#1a0dab;text-decoration:none;">{website}</a></p>
        <p style="margin:0;line-height:1;">
          {social}
        </p>
      </td>
    </tr>
  </table>
"#;

static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<table id="email-signature".*?</table>"#).expect("signature regex")
});

/// Synthesize the signature block from profile fields. Missing social
/// platforms are omitted entirely — no broken icon markup.
pub fn build_signature(profile: &SenderProfile) -> String {
    let photo = if profile.photo_url.is_empty() {
        PHOTO_PLACEHOLDER
    } else {
        &profile.photo_url
    };

    SIGNATURE_TEMPLATE
        .replace("{photo}", photo)
        .replace("{name}", &profile.name)
        .replace("{profession}", &profile.profession)
        .replace("{phone}", &profile.phone)
        .replace("{email}", &profile.email)
        .replace("{website}", &profile.website)
        .replace("{social}", &social_links(profile))
}

/// Icon row built only from the profile URLs that are present.
fn social_links(profile: &SenderProfile) -> String {
    let mut links = Vec::new();
    if !profile.linkedin.is_empty() {
        links.push(format!(
            r#"<span style="display:inline-block;margin-right:10px;"><a href="{}" style="text-decoration:none;"><img src="https://img.icons8.com/color/24/linkedin.png" alt="LinkedIn"></a></span>"#,
            profile.linkedin
        ));
    }
    if !profile.github.is_empty() {
        links.push(format!(
            r#"<span style="display:inline-block;margin-right:10px;"><a href="{}" style="text-decoration:none;"><img src="https://img.icons8.com/material-outlined/24/github.png" alt="GitHub"></a></span>"#,
            profile.github
        ));
    }
    if !profile.twitter.is_empty() {
        links.push(format!(
            r#"<span style="display:inline-block;"><a href="{}" style="text-decoration:none;"><img src="https://img.icons8.com/color/24/twitter.png" alt="Twitter"></a></span>"#,
            profile.twitter
        ));
    }
    links.join("")
}

/// True if the body already carries an injected signature block.
pub fn has_signature(body: &str) -> bool {
    body.contains(SIGNATURE_MARKER)
}

/// Remove every signature table from a body. Used before re-injection
/// and when sanitizing rewritten HTML.
pub fn strip_signature(body: &str) -> String {
    SIGNATURE_RE.replace_all(body, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_platforms_omitted() {
        let profile = SenderProfile {
            name: "Sam Park".into(),
            email: "sam@example.com".into(),
            linkedin: "https://linkedin.com/in/sam".into(),
            ..Default::default()
        };
        let sig = build_signature(&profile);
        assert!(sig.contains("linkedin.com/in/sam"));
        assert!(!sig.contains("github.png"));
        assert!(!sig.contains("twitter.png"));
    }

    #[test]
    fn test_photo_placeholder_when_absent() {
        let sig = build_signature(&SenderProfile::default());
        assert!(sig.contains(PHOTO_PLACEHOLDER));
    }

    #[test]
    fn test_strip_round_trip() {
        let profile = SenderProfile {
            name: "Sam".into(),
            ..Default::default()
        };
        let sig = build_signature(&profile);
        let body = format!("<p>hello</p>{sig}<p>tail</p>");
        assert!(has_signature(&body));
        let stripped = strip_signature(&body);
        assert!(!has_signature(&stripped));
        assert!(stripped.contains("<p>hello</p>"));
        assert!(stripped.contains("<p>tail</p>"));
    }
}

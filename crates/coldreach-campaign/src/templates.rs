//! Built-in template catalog. Bodies are HTML fragments carrying merge
//! tokens and ending in `[Footer]`, which the merge engine swaps for the
//! generated signature block.

use coldreach_core::types::EmailTemplate;

/// The static template catalog.
pub fn catalog() -> Vec<EmailTemplate> {
    vec![
        EmailTemplate {
            id: "engineering-outreach".into(),
            name: "Engineering Role Outreach".into(),
            subject: "Exploring Software Engineering opportunities at [Company Name]".into(),
            body: r#"
      <div style="font-family:Arial,sans-serif;color:#333;font-size:16px;line-height:1.5;">
        <p>Hi [Name],</p>
        <p>
          I hope you are doing well. I've been following what <strong>[Company Name]</strong> is building,
          and I'm impressed by the engineering challenges your team is tackling. I enjoy building
          end-to-end systems and would love to contribute.
        </p>
        <p>
          I bring [Your Experience] as a [Your Profession], working across
          <strong>[Your Skills]</strong>. A recent highlight: [Your Achievements].
        </p>
        <p>
          I would love to learn more about any software engineering opportunities at
          <strong>[Company Name]</strong> — or, if someone on your team is a better contact,
          I'd appreciate a referral. My resume is attached, and I'm happy to share anything else
          that would be useful.
        </p>
        <p>Looking forward to hearing from you!</p>
        [Footer]
      </div>
    "#
            .into(),
        },
        EmailTemplate {
            id: "direct-application".into(),
            name: "Direct Application Inquiry".into(),
            subject: "Inquiry regarding the [Job Title] position".into(),
            body: r#"
      <div style="font-family:Arial,sans-serif;color:#333;font-size:16px;line-height:1.5;">
        <p>Hi [Name],</p>
        <p>My name is <strong>[Your Name]</strong>, and I'm writing to express my interest in the
        [Job Title] position at [Company Name]. With experience in [Your Skills], I believe I can
        contribute meaningfully.</p>
        <p>My resume is attached for your review. I'd appreciate any next steps or guidance you can share.</p>
        [Footer]
      </div>
    "#
            .into(),
        },
        EmailTemplate {
            id: "follow-up".into(),
            name: "Follow-up Email".into(),
            subject: "Following up on my application for [Job Title]".into(),
            body: r#"
      <div style="font-family:Arial,sans-serif;color:#333;font-size:16px;line-height:1.5;">
        <p>Hi [Name],</p>
        <p>I hope you're having a great week. I'm writing to politely follow up on my email from
        last week regarding the [Job Title] position. I'm still very interested in the opportunity
        to contribute to [Company Name].</p>
        <p>My resume is attached again for convenience.</p>
        [Footer]
      </div>
    "#
            .into(),
        },
    ]
}

/// Look up a catalog template by id.
pub fn by_id(id: &str) -> Option<EmailTemplate> {
    catalog().into_iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_bodies_carry_footer_token() {
        let templates = catalog();
        assert_eq!(templates.len(), 3);
        for t in &templates {
            assert!(t.body.contains("[Footer]"), "template {} lacks [Footer]", t.id);
            assert!(t.body.contains("[Name]"));
        }
    }

    #[test]
    fn test_lookup_by_id() {
        assert!(by_id("follow-up").is_some());
        assert!(by_id("nope").is_none());
    }
}

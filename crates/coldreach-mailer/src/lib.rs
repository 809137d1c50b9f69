//! # Coldreach Mailer
//!
//! Mail delivery behind a small `Mailer` trait so the orchestrator and
//! the dispatcher never care whether mail goes out over SMTP or into a
//! test buffer.
//!
//! - [`smtp::SmtpMailer`] — STARTTLS relay via lettre (the real thing).
//! - [`memory::MemoryMailer`] — records sends in memory, with optional
//!   per-address failure injection; used by tests and dry runs.

pub mod memory;
pub mod smtp;

use async_trait::async_trait;
use coldreach_core::error::Result;

pub use memory::MemoryMailer;
pub use smtp::SmtpMailer;

/// One fully-rendered outgoing email.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    /// Display name for the From header; the envelope sender is always
    /// the relay account.
    pub from_name: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<MailAttachment>,
}

/// A decoded attachment ready to go on the wire.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Mail delivery collaborator. Failures carry a human-readable reason.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Attachment filename for a sender's resume: sanitized display name
/// plus a fixed suffix, e.g. `"Sam Park Resume.pdf"`.
pub fn resume_filename(from_name: &str) -> String {
    let safe = sanitize_for_filename(from_name);
    let safe = if safe.is_empty() { "User".to_string() } else { safe };
    format!("{safe} Resume.pdf")
}

/// Remove characters illegal on Windows and in mail gateways; collapse
/// whitespace runs.
fn sanitize_for_filename(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_filename() {
        assert_eq!(resume_filename("Sam Park"), "Sam Park Resume.pdf");
        assert_eq!(resume_filename("Sam / Park??"), "Sam Park Resume.pdf");
        assert_eq!(resume_filename("  Sam   Park  "), "Sam Park Resume.pdf");
        assert_eq!(resume_filename(""), "User Resume.pdf");
        assert_eq!(resume_filename("<>:*"), "User Resume.pdf");
    }
}

//! Domain data model — the records the campaign pipeline moves around.
//!
//! Every entity is scoped to a `user_id`. The dispatcher is the only
//! component that reads across users, and only over the scheduled queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person the user reaches out to. Unique by email within a user's
/// contact set (best-effort — callers de-dupe before insert).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Create a new contact with a fresh id.
    pub fn new(name: &str, email: &str, company: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            company: company.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// The sender's own profile — one per user. `name` and `email` gate the
/// ability to send; everything else feeds merge tokens and the signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub profession: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Years of experience; 0 means unspecified.
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub photo_url: String,
}

/// An email template: subject and HTML body carrying merge tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
}

/// An attachment as it travels through the schedule API and the queue.
/// Content is base64 so records stay plain JSON end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAttachment {
    pub filename: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub content_base64: String,
}

fn default_content_type() -> String {
    "application/pdf".into()
}

/// A persisted send request awaiting dispatch.
///
/// `send_at` is immutable once set. The record is deleted exactly once:
/// by successful dispatch, or by being discarded as malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEmail {
    pub id: String,
    pub user_id: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(default)]
    pub attachments: Vec<EmailAttachment>,
    #[serde(default)]
    pub from_name: String,
    /// Recipient name/company and template name travel with the record
    /// so the relocated history entry is fully populated.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub template: String,
    pub send_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Ledger status of a sent email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutreachStatus {
    #[serde(rename = "Initial Outreach")]
    InitialOutreach,
    #[serde(rename = "Initial Outreach (Scheduled)")]
    InitialOutreachScheduled,
    #[serde(rename = "Follow-up Sent")]
    FollowUpSent,
}

impl OutreachStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialOutreach => "Initial Outreach",
            Self::InitialOutreachScheduled => "Initial Outreach (Scheduled)",
            Self::FollowUpSent => "Follow-up Sent",
        }
    }

    /// Parse a stored status string; unknown values fall back to
    /// `Initial Outreach` rather than failing a whole listing.
    pub fn parse(s: &str) -> Self {
        match s {
            "Initial Outreach (Scheduled)" => Self::InitialOutreachScheduled,
            "Follow-up Sent" => Self::FollowUpSent,
            _ => Self::InitialOutreach,
        }
    }
}

impl std::fmt::Display for OutreachStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry for an actually-sent email. Append-only, except the
/// follow-up status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub template: String,
    pub status: OutreachStatus,
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub follow_up_for: Option<String>,
}

impl HistoryRecord {
    /// Build a fresh ledger entry timestamped now.
    pub fn new(user_id: &str, name: &str, email: &str, company: &str, template: &str, status: OutreachStatus) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            company: company.to_string(),
            template: template.to_string(),
            status,
            sent_at: now,
            created_at: now,
            follow_up_for: None,
        }
    }
}

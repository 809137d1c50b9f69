//! Scheduled-send write path.
//!
//! The whole batch is validated before anything is written: one bad
//! `send_at` rejects every entry, so a broken record can never reach
//! the queue. Entries without a `send_at` default to "now" — picked up
//! on the next dispatcher run.

use chrono::{DateTime, Utc};
use coldreach_core::error::{OutreachError, Result};
use coldreach_core::types::{EmailAttachment, ScheduledEmail};
use coldreach_store::OutreachDb;
use serde::Deserialize;

/// One email in a schedule request.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEmailRequest {
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(default)]
    pub attachments: Vec<EmailAttachment>,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub template: String,
    /// RFC 3339 due time; absent means immediate pickup.
    #[serde(default)]
    pub send_at: Option<String>,
}

/// Persist a batch of scheduled emails for a user. Returns the number
/// of entries written; a single invalid `send_at` rejects the batch
/// with zero records persisted.
pub fn schedule_emails(
    db: &OutreachDb,
    user_id: &str,
    requests: &[ScheduleEmailRequest],
) -> Result<usize> {
    if user_id.is_empty() || requests.is_empty() {
        return Err(OutreachError::Validation(
            "Missing or invalid user ID or emails array.".into(),
        ));
    }

    // Parse every due time up front — reject the whole batch on the
    // first malformed value, before any write.
    let now = Utc::now();
    let mut entries = Vec::with_capacity(requests.len());
    for req in requests {
        let send_at = match &req.send_at {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| {
                    OutreachError::Validation(format!("Invalid send_at value: {raw}"))
                })?,
            None => now,
        };
        entries.push(ScheduledEmail {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            to: req.to.clone(),
            subject: req.subject.clone(),
            html: req.html.clone(),
            attachments: req.attachments.clone(),
            from_name: req.from_name.clone(),
            name: req.name.clone(),
            company: req.company.clone(),
            template: req.template.clone(),
            send_at,
            status: "scheduled".into(),
            created_at: now,
        });
    }

    db.schedule_batch(&entries)?;
    tracing::info!("📅 Scheduled {} email(s) for {user_id}", entries.len());
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp(name: &str) -> (OutreachDb, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("coldreach-sched-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).ok();
        let db = OutreachDb::open(&dir.join("test.db")).unwrap();
        (db, dir)
    }

    fn request(to: &str, send_at: Option<&str>) -> ScheduleEmailRequest {
        ScheduleEmailRequest {
            to: to.into(),
            subject: "hello".into(),
            html: "<p>hello</p>".into(),
            attachments: vec![],
            from_name: "Sam".into(),
            name: "".into(),
            company: "".into(),
            template: "".into(),
            send_at: send_at.map(str::to_string),
        }
    }

    #[test]
    fn test_batch_persisted_with_defaults() {
        let (db, dir) = open_temp("ok");
        let count = schedule_emails(
            &db,
            "u1",
            &[
                request("a@example.com", Some("2030-01-01T09:00:00Z")),
                request("b@example.com", None),
            ],
        )
        .unwrap();
        assert_eq!(count, 2);

        let queued = db.list_scheduled("u1").unwrap();
        assert_eq!(queued.len(), 2);
        // The entry without a due time defaults to now — already due.
        assert_eq!(queued[0].to, "b@example.com");
        assert_eq!(queued[0].status, "scheduled");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_one_bad_send_at_rejects_whole_batch() {
        let (db, dir) = open_temp("reject");
        let result = schedule_emails(
            &db,
            "u1",
            &[
                request("a@example.com", Some("2030-01-01T09:00:00Z")),
                request("b@example.com", Some("not-a-date")),
                request("c@example.com", None),
            ],
        );
        match result {
            Err(OutreachError::Validation(msg)) => assert!(msg.contains("not-a-date")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(db.list_scheduled("u1").unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_batch_rejected() {
        let (db, dir) = open_temp("empty");
        assert!(schedule_emails(&db, "u1", &[]).is_err());
        assert!(schedule_emails(&db, "", &[request("a@b.c", None)]).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}

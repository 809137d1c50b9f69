//! The dispatcher — promotes due scheduled emails into sent history.
//!
//! One invocation is one unit of work: query due items across every
//! user, discard malformed records, send the rest in due-time order,
//! then commit all bookkeeping (history inserts + queue deletions) as a
//! single transaction. Items whose send fails stay queued and are
//! retried on the next run; re-running with nothing due is a no-op.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use coldreach_core::error::Result;
use coldreach_core::types::{HistoryRecord, OutreachStatus, ScheduledEmail};
use coldreach_mailer::{MailAttachment, Mailer, OutgoingEmail};
use coldreach_store::OutreachDb;
use serde::Serialize;

/// Outcome of one dispatcher run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Due records matched by the query.
    pub matched: usize,
    /// Sent and relocated into history.
    pub sent: usize,
    /// Malformed records deleted without sending.
    pub discarded: usize,
    /// Send failures left in the queue for the next run.
    pub retained: usize,
}

impl DispatchReport {
    pub fn message(&self) -> String {
        if self.matched == 0 {
            "No emails to send.".into()
        } else {
            format!("Successfully sent and moved {} emails.", self.sent)
        }
    }
}

/// Run one dispatch pass over everything due at `now`.
pub async fn run_dispatch(
    db: &OutreachDb,
    mailer: &dyn Mailer,
    now: DateTime<Utc>,
) -> Result<DispatchReport> {
    let due = db.due_scheduled(now)?;
    let mut report = DispatchReport {
        matched: due.len(),
        ..Default::default()
    };
    if due.is_empty() {
        tracing::info!("⏰ Dispatch: no emails to send");
        return Ok(report);
    }
    tracing::info!("⏰ Dispatch: {} due record(s)", due.len());

    let mut relocated: Vec<HistoryRecord> = Vec::new();
    let mut delete_ids: Vec<String> = Vec::new();

    for item in due {
        let attachments = match decode_attachments(&item) {
            Some(a) => a,
            None => {
                // Undecodable attachment payload — treat like any other
                // malformed record: drop it, never retry it.
                tracing::warn!("⚠️ Skipping malformed scheduled email {} (bad attachment)", item.id);
                delete_ids.push(item.id);
                report.discarded += 1;
                continue;
            }
        };
        if item.to.is_empty() || item.subject.is_empty() || item.html.is_empty() || item.user_id.is_empty() {
            tracing::warn!("⚠️ Skipping malformed scheduled email {}", item.id);
            delete_ids.push(item.id);
            report.discarded += 1;
            continue;
        }

        let email = OutgoingEmail {
            from_name: if item.from_name.is_empty() {
                "Outreach".into()
            } else {
                item.from_name.clone()
            },
            to: item.to.clone(),
            subject: item.subject.clone(),
            html: item.html.clone(),
            attachments,
        };

        match mailer.send(&email).await {
            Ok(()) => {
                let mut record = HistoryRecord::new(
                    &item.user_id,
                    &item.name,
                    &item.to,
                    &item.company,
                    &item.template,
                    OutreachStatus::InitialOutreachScheduled,
                );
                record.sent_at = now;
                record.created_at = item.created_at;
                relocated.push(record);
                delete_ids.push(item.id);
                report.sent += 1;
            }
            Err(e) => {
                // Left in the queue: the next run retries it. Not marked
                // sent, not duplicated into history.
                tracing::error!("❌ Email send failed for scheduled {}: {e}", item.id);
                report.retained += 1;
            }
        }
    }

    // All bookkeeping for the run commits at once, after every send has
    // settled — all-or-nothing, independent of per-item send outcomes.
    if !relocated.is_empty() || !delete_ids.is_empty() {
        db.finalize_run(&relocated, &delete_ids)?;
    }

    tracing::info!(
        "⏰ Dispatch complete: {} sent, {} discarded, {} retained",
        report.sent,
        report.discarded,
        report.retained
    );
    Ok(report)
}

/// Decode queued base64 attachments into wire-ready bytes.
fn decode_attachments(item: &ScheduledEmail) -> Option<Vec<MailAttachment>> {
    let mut out = Vec::with_capacity(item.attachments.len());
    for att in &item.attachments {
        let content = BASE64.decode(&att.content_base64).ok()?;
        out.push(MailAttachment {
            filename: att.filename.clone(),
            content_type: att.content_type.clone(),
            content,
        });
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldreach_mailer::MemoryMailer;
    use coldreach_core::types::EmailAttachment;

    fn open_temp(name: &str) -> (OutreachDb, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("coldreach-dispatch-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).ok();
        let db = OutreachDb::open(&dir.join("test.db")).unwrap();
        (db, dir)
    }

    fn scheduled(id: &str, user: &str, to: &str, send_at: DateTime<Utc>) -> ScheduledEmail {
        ScheduledEmail {
            id: id.into(),
            user_id: user.into(),
            to: to.into(),
            subject: "hello".into(),
            html: "<p>hello</p>".into(),
            attachments: vec![],
            from_name: "Sam".into(),
            name: "Recipient".into(),
            company: "Acme".into(),
            template: "Test".into(),
            send_at,
            status: "scheduled".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_nothing_due_is_a_noop() {
        let (db, dir) = open_temp("noop");
        let now = Utc::now();
        db.schedule_batch(&[scheduled("a", "u1", "a@x.io", now + chrono::Duration::hours(1))])
            .unwrap();

        let mailer = MemoryMailer::new();
        let report = run_dispatch(&db, &mailer, now).await.unwrap();

        assert_eq!(report.matched, 0);
        assert_eq!(report.sent, 0);
        assert_eq!(report.message(), "No emails to send.");
        assert_eq!(mailer.sent_count(), 0);
        assert_eq!(db.list_scheduled("u1").unwrap().len(), 1);
        assert!(db.list_history("u1").unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_malformed_discarded_and_valid_sent() {
        let (db, dir) = open_temp("malformed");
        let now = Utc::now();
        let mut broken = scheduled("bad", "u1", "", now - chrono::Duration::minutes(1));
        broken.to = String::new();
        db.schedule_batch(&[
            scheduled("good", "u1", "good@x.io", now - chrono::Duration::minutes(2)),
            broken,
        ])
        .unwrap();

        let mailer = MemoryMailer::new();
        let report = run_dispatch(&db, &mailer, now).await.unwrap();

        assert_eq!(report.matched, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.discarded, 1);
        assert_eq!(mailer.sent_count(), 1);

        // Both records are gone from the queue; exactly one reached history.
        assert!(db.list_scheduled("u1").unwrap().is_empty());
        let history = db.list_history("u1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].email, "good@x.io");
        assert_eq!(history[0].status, OutreachStatus::InitialOutreachScheduled);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_send_failure_retained_then_retried() {
        let (db, dir) = open_temp("retry");
        let now = Utc::now();
        db.schedule_batch(&[scheduled("a", "u1", "flaky@x.io", now - chrono::Duration::minutes(1))])
            .unwrap();

        let mailer = MemoryMailer::new();
        mailer.fail_address("flaky@x.io");

        let report = run_dispatch(&db, &mailer, now).await.unwrap();
        assert_eq!(report.retained, 1);
        assert_eq!(report.sent, 0);
        // Still queued, not in history.
        assert_eq!(db.list_scheduled("u1").unwrap().len(), 1);
        assert!(db.list_history("u1").unwrap().is_empty());

        // Relay recovers; the next run delivers it.
        mailer.heal();
        let report = run_dispatch(&db, &mailer, now).await.unwrap();
        assert_eq!(report.sent, 1);
        assert!(db.list_scheduled("u1").unwrap().is_empty());
        assert_eq!(db.list_history("u1").unwrap().len(), 1);

        // And a further run sees nothing — no duplicate send.
        let report = run_dispatch(&db, &mailer, now).await.unwrap();
        assert_eq!(report.matched, 0);
        assert_eq!(mailer.sent_count(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_attachments_decoded_onto_the_wire() {
        let (db, dir) = open_temp("attach");
        let now = Utc::now();
        let mut item = scheduled("a", "u1", "to@x.io", now);
        item.attachments = vec![EmailAttachment {
            filename: "Sam Resume.pdf".into(),
            content_type: "application/pdf".into(),
            content_base64: BASE64.encode(b"%PDF-1.4 resume"),
        }];
        db.schedule_batch(&[item]).unwrap();

        let mailer = MemoryMailer::new();
        run_dispatch(&db, &mailer, now).await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments.len(), 1);
        assert_eq!(sent[0].attachments[0].content, b"%PDF-1.4 resume");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_bad_attachment_payload_discards_record() {
        let (db, dir) = open_temp("badattach");
        let now = Utc::now();
        let mut item = scheduled("a", "u1", "to@x.io", now);
        item.attachments = vec![EmailAttachment {
            filename: "x.pdf".into(),
            content_type: "application/pdf".into(),
            content_base64: "!!! not base64 !!!".into(),
        }];
        db.schedule_batch(&[item]).unwrap();

        let mailer = MemoryMailer::new();
        let report = run_dispatch(&db, &mailer, now).await.unwrap();

        assert_eq!(report.discarded, 1);
        assert_eq!(mailer.sent_count(), 0);
        assert!(db.list_scheduled("u1").unwrap().is_empty());
        assert!(db.list_history("u1").unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}

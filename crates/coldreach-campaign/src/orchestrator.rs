//! Campaign orchestrator — turns a recipient list plus a template into
//! personalized sends, settling every outcome before bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use coldreach_core::error::{OutreachError, Result};
use coldreach_core::types::{Contact, EmailTemplate, HistoryRecord, OutreachStatus};
use coldreach_mailer::{MailAttachment, Mailer, OutgoingEmail, resume_filename};
use coldreach_merge::personalize;
use coldreach_store::{OutreachDb, ResumeStore};
use serde::{Deserialize, Serialize};

/// A campaign target. `history_ref` links a follow-up back to the
/// ledger entry it follows up on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRecipient {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub history_ref: Option<String>,
}

/// Send mode flags.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SendOptions {
    #[serde(default)]
    pub is_follow_up: bool,
    #[serde(default)]
    pub is_test: bool,
}

/// One recipient whose send failed, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SendFailure {
    pub name: String,
    pub email: String,
    pub reason: String,
}

/// Outcome of one campaign.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub total: usize,
    pub processed: usize,
    pub failures: Vec<SendFailure>,
}

impl CampaignReport {
    /// User-facing summary — always "X of Y", never a bare "success".
    pub fn summary(&self) -> String {
        format!("{} of {} emails were processed.", self.processed, self.total)
    }
}

/// The campaign orchestrator.
pub struct Orchestrator {
    db: Arc<OutreachDb>,
    resumes: Arc<ResumeStore>,
    mailer: Arc<dyn Mailer>,
}

impl Orchestrator {
    pub fn new(db: Arc<OutreachDb>, resumes: Arc<ResumeStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, resumes, mailer }
    }

    /// The user-initiated entry point: check preconditions, save any
    /// recipients that aren't contacts yet, then send.
    pub async fn initiate(
        &self,
        user_id: &str,
        recipients: &[CampaignRecipient],
        template: &EmailTemplate,
        opts: SendOptions,
    ) -> Result<CampaignReport> {
        if recipients.is_empty() {
            return Err(OutreachError::Validation("No recipients selected.".into()));
        }
        let profile = self.db.get_profile(user_id)?.unwrap_or_default();
        if profile.name.is_empty() {
            return Err(OutreachError::Validation(
                "Please add your name in Settings before sending emails.".into(),
            ));
        }
        if !self.resumes.exists(user_id) {
            return Err(OutreachError::Validation(
                "Please upload your resume in Settings before sending emails.".into(),
            ));
        }

        // Best-effort contact upsert: a failure here is reported but
        // never blocks the send itself.
        if let Err(e) = self.save_new_contacts(user_id, recipients) {
            tracing::warn!("⚠️ Could not save new contacts: {e}");
        }

        self.send(user_id, recipients, template, opts).await
    }

    /// Persist recipients not yet in the user's contact set.
    fn save_new_contacts(&self, user_id: &str, recipients: &[CampaignRecipient]) -> Result<()> {
        let mut known = self.db.contact_emails(user_id)?;
        let mut fresh = Vec::new();
        for r in recipients {
            if !known.contains(&r.email) {
                known.insert(r.email.clone());
                fresh.push(Contact::new(&r.name, &r.email, &r.company));
            }
        }
        if !fresh.is_empty() {
            self.db.insert_contacts(user_id, &fresh)?;
            tracing::info!("💾 {} new contact(s) saved for {user_id}", fresh.len());
        }
        Ok(())
    }

    /// Send a campaign: personalize per recipient, fan out, settle all
    /// outcomes, then commit bookkeeping in one batch.
    pub async fn send(
        &self,
        user_id: &str,
        recipients: &[CampaignRecipient],
        template: &EmailTemplate,
        opts: SendOptions,
    ) -> Result<CampaignReport> {
        let profile = self.db.get_profile(user_id)?.unwrap_or_default();
        if profile.name.is_empty() {
            return Err(OutreachError::Validation(
                "Please add your name in Settings before sending emails.".into(),
            ));
        }

        // A test send goes to exactly one synthetic recipient: the
        // sender themselves. Never recorded in history.
        let targets: Vec<CampaignRecipient> = if opts.is_test {
            if profile.email.is_empty() {
                return Err(OutreachError::Validation(
                    "Please add your email in Settings before sending a test email.".into(),
                ));
            }
            vec![CampaignRecipient {
                name: profile.name.clone(),
                email: profile.email.clone(),
                company: String::new(),
                history_ref: None,
            }]
        } else {
            recipients.to_vec()
        };

        // The resume is fetched once per campaign, not per recipient.
        // A fetch error (other than "nothing uploaded") aborts the whole
        // batch before any mail goes out.
        let attachment = match self.resumes.fetch(user_id) {
            Ok(bytes) => Some(MailAttachment {
                filename: resume_filename(&profile.name),
                content_type: "application/pdf".into(),
                content: bytes,
            }),
            Err(OutreachError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        // Fan out: every send issued concurrently, every outcome awaited.
        let mut sends = Vec::with_capacity(targets.len());
        for recipient in &targets {
            let contact = Contact::new(&recipient.name, &recipient.email, &recipient.company);
            let rendered = personalize(template, &contact, &profile);
            let email = OutgoingEmail {
                from_name: profile.name.clone(),
                to: recipient.email.clone(),
                subject: rendered.subject,
                html: rendered.body,
                attachments: attachment.iter().cloned().collect(),
            };
            let mailer = Arc::clone(&self.mailer);
            let recipient = recipient.clone();
            sends.push(async move {
                match mailer.send(&email).await {
                    Ok(()) => Ok(recipient),
                    Err(e) => Err((recipient, e.to_string())),
                }
            });
        }
        let outcomes = futures::future::join_all(sends).await;

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(recipient) => successes.push(recipient),
                Err((recipient, reason)) => {
                    tracing::error!(
                        "❌ Failed to send email to {} <{}>: {reason}",
                        recipient.name,
                        recipient.email
                    );
                    failures.push(SendFailure {
                        name: recipient.name,
                        email: recipient.email,
                        reason,
                    });
                }
            }
        }

        // Bookkeeping: successes land in history as one atomic batch.
        // A follow-up that references an existing ledger entry mutates
        // it in place; everything else becomes a fresh record.
        if !opts.is_test && !successes.is_empty() {
            let now = Utc::now();
            let mut inserts = Vec::new();
            let mut follow_ups = Vec::new();
            for rec in &successes {
                let existing_ref = if opts.is_follow_up { rec.history_ref.clone() } else { None };
                match existing_ref {
                    Some(ref_id) => follow_ups.push((ref_id, now)),
                    None => {
                        let mut record = HistoryRecord::new(
                            user_id,
                            &rec.name,
                            &rec.email,
                            &rec.company,
                            &template.name,
                            OutreachStatus::InitialOutreach,
                        );
                        record.sent_at = now;
                        inserts.push(record);
                    }
                }
            }
            self.db.commit_campaign(&inserts, &follow_ups)?;
        }

        let report = CampaignReport {
            total: targets.len(),
            processed: successes.len(),
            failures,
        };
        tracing::info!("📨 Campaign for {user_id}: {}", report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldreach_mailer::MemoryMailer;

    struct Fixture {
        db: Arc<OutreachDb>,
        resumes: Arc<ResumeStore>,
        mailer: Arc<MemoryMailer>,
        orchestrator: Orchestrator,
        dir: std::path::PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.dir).ok();
        }
    }

    fn fixture(name: &str) -> Fixture {
        let dir = std::env::temp_dir().join(format!("coldreach-orch-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).ok();
        let db = Arc::new(OutreachDb::open(&dir.join("test.db")).unwrap());
        let resumes = Arc::new(ResumeStore::new(&dir.join("resumes")));
        let mailer = Arc::new(MemoryMailer::new());
        let orchestrator = Orchestrator::new(
            Arc::clone(&db),
            Arc::clone(&resumes),
            Arc::clone(&mailer) as Arc<dyn Mailer>,
        );
        Fixture { db, resumes, mailer, orchestrator, dir }
    }

    fn seed_sender(f: &Fixture) {
        let profile = coldreach_core::types::SenderProfile {
            name: "Sam Park".into(),
            email: "sam@example.com".into(),
            ..Default::default()
        };
        f.db.put_profile("u1", &profile).unwrap();
        f.resumes.save("u1", b"%PDF-1.4 resume").unwrap();
    }

    fn recipient(name: &str, email: &str) -> CampaignRecipient {
        CampaignRecipient {
            name: name.into(),
            email: email.into(),
            company: "Acme".into(),
            history_ref: None,
        }
    }

    fn template() -> EmailTemplate {
        EmailTemplate {
            id: "t".into(),
            name: "Test Template".into(),
            subject: "Hello [Company Name]".into(),
            body: "<p>Hi [Name],</p>[Footer]".into(),
        }
    }

    #[tokio::test]
    async fn test_preconditions_block_without_side_effects() {
        let f = fixture("preconditions");

        // No recipients.
        let err = f
            .orchestrator
            .initiate("u1", &[], &template(), SendOptions::default())
            .await;
        assert!(matches!(err, Err(OutreachError::Validation(_))));

        // No profile name.
        let err = f
            .orchestrator
            .initiate("u1", &[recipient("Jane", "jane@acme.io")], &template(), SendOptions::default())
            .await;
        assert!(matches!(err, Err(OutreachError::Validation(_))));

        // Profile but no resume.
        f.db.put_profile(
            "u1",
            &coldreach_core::types::SenderProfile {
                name: "Sam".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let err = f
            .orchestrator
            .initiate("u1", &[recipient("Jane", "jane@acme.io")], &template(), SendOptions::default())
            .await;
        assert!(matches!(err, Err(OutreachError::Validation(_))));

        assert_eq!(f.mailer.sent_count(), 0);
        assert!(f.db.list_history("u1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failures_settle_and_report() {
        let f = fixture("partial");
        seed_sender(&f);
        f.mailer.fail_address("b@acme.io");
        f.mailer.fail_address("d@acme.io");

        let recipients = vec![
            recipient("Ann One", "a@acme.io"),
            recipient("Ben Two", "b@acme.io"),
            recipient("Cat Three", "c@acme.io"),
            recipient("Dan Four", "d@acme.io"),
            recipient("Eve Five", "e@acme.io"),
        ];
        let report = f
            .orchestrator
            .initiate("u1", &recipients, &template(), SendOptions::default())
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.processed, 3);
        assert_eq!(report.summary(), "3 of 5 emails were processed.");
        let failed: Vec<&str> = report.failures.iter().map(|f| f.email.as_str()).collect();
        assert_eq!(failed, vec!["b@acme.io", "d@acme.io"]);
        assert!(report.failures.iter().all(|f| !f.name.is_empty()));

        // Exactly the three successes reach the ledger.
        let history = f.db.list_history("u1").unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|h| h.status == OutreachStatus::InitialOutreach));
    }

    #[tokio::test]
    async fn test_resume_attached_with_derived_filename() {
        let f = fixture("attachment");
        seed_sender(&f);

        f.orchestrator
            .initiate("u1", &[recipient("Jane Doe", "jane@acme.io")], &template(), SendOptions::default())
            .await
            .unwrap();

        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments.len(), 1);
        assert_eq!(sent[0].attachments[0].filename, "Sam Park Resume.pdf");
        assert!(sent[0].subject.contains("Acme"));
        assert!(sent[0].html.contains("Jane"));
    }

    #[tokio::test]
    async fn test_test_send_targets_sender_and_skips_history() {
        let f = fixture("testsend");
        seed_sender(&f);

        let report = f
            .orchestrator
            .send(
                "u1",
                &[recipient("Jane", "jane@acme.io")],
                &template(),
                SendOptions { is_test: true, ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.processed, 1);
        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "sam@example.com");
        assert!(f.db.list_history("u1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_mutates_referenced_record() {
        let f = fixture("followup");
        seed_sender(&f);

        let original = HistoryRecord::new(
            "u1",
            "Jane",
            "jane@acme.io",
            "Acme",
            "Test Template",
            OutreachStatus::InitialOutreach,
        );
        let ref_id = original.id.clone();
        f.db.insert_history(&[original]).unwrap();

        let mut rec = recipient("Jane", "jane@acme.io");
        rec.history_ref = Some(ref_id.clone());
        f.orchestrator
            .send(
                "u1",
                &[rec],
                &template(),
                SendOptions { is_follow_up: true, ..Default::default() },
            )
            .await
            .unwrap();

        // Mutation, not a new record.
        let history = f.db.list_history("u1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, ref_id);
        assert_eq!(history[0].status, OutreachStatus::FollowUpSent);
    }

    #[tokio::test]
    async fn test_new_recipients_saved_as_contacts() {
        let f = fixture("upsert");
        seed_sender(&f);
        f.db.insert_contacts("u1", &[Contact::new("Jane", "jane@acme.io", "Acme")])
            .unwrap();

        f.orchestrator
            .initiate(
                "u1",
                &[recipient("Jane", "jane@acme.io"), recipient("New Person", "new@acme.io")],
                &template(),
                SendOptions::default(),
            )
            .await
            .unwrap();

        let emails = f.db.contact_emails("u1").unwrap();
        assert!(emails.contains("new@acme.io"));
        // The existing contact is not duplicated.
        assert_eq!(f.db.list_contacts("u1").unwrap().len(), 2);
    }
}

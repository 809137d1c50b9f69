//! SQLite persistence for contacts, profiles, the scheduled-send queue,
//! and the send history ledger.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use coldreach_core::error::{OutreachError, Result};
use coldreach_core::types::{Contact, HistoryRecord, OutreachStatus, ScheduledEmail, SenderProfile};
use rusqlite::{Connection, params};

/// Outreach database — all durable per-user collections.
pub struct OutreachDb {
    conn: Mutex<Connection>,
}

/// Canonical timestamp format: RFC 3339, whole seconds, `Z` suffix.
/// Keeping it uniform makes string comparison in SQL chronological.
fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl OutreachDb {
    /// Open or create the database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| OutreachError::Persistence(format!("DB open: {e}")))?;

        // WAL keeps reads cheap while the dispatcher writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| OutreachError::Persistence(format!("Lock: {e}")))
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contacts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL,
                company TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_contacts_user ON contacts(user_id, email);

            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                profession TEXT NOT NULL DEFAULT '',
                skills_json TEXT NOT NULL DEFAULT '[]',
                experience INTEGER NOT NULL DEFAULT 0,
                achievements_json TEXT NOT NULL DEFAULT '[]',
                website TEXT NOT NULL DEFAULT '',
                linkedin TEXT NOT NULL DEFAULT '',
                github TEXT NOT NULL DEFAULT '',
                twitter TEXT NOT NULL DEFAULT '',
                photo_url TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scheduled_emails (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                to_addr TEXT NOT NULL DEFAULT '',
                subject TEXT NOT NULL DEFAULT '',
                html TEXT NOT NULL DEFAULT '',
                attachments_json TEXT NOT NULL DEFAULT '[]',
                from_name TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                template TEXT NOT NULL DEFAULT '',
                send_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'scheduled',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_scheduled_due ON scheduled_emails(send_at);

            CREATE TABLE IF NOT EXISTS history (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                template TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                follow_up_for TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_history_user ON history(user_id, created_at);
            ",
        )
        .map_err(|e| OutreachError::Persistence(format!("Migration: {e}")))?;
        Ok(())
    }

    // ─── Contacts ──────────────────────────────────────

    /// Insert a batch of contacts in one transaction.
    pub fn insert_contacts(&self, user_id: &str, contacts: &[Contact]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| OutreachError::Persistence(format!("Begin: {e}")))?;
        for c in contacts {
            tx.execute(
                "INSERT INTO contacts (id, user_id, name, email, company, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![c.id, user_id, c.name, c.email, c.company, ts(c.created_at)],
            )
            .map_err(|e| OutreachError::Persistence(format!("Insert contact: {e}")))?;
        }
        tx.commit()
            .map_err(|e| OutreachError::Persistence(format!("Commit contacts: {e}")))?;
        Ok(())
    }

    /// All contacts for a user, newest first.
    pub fn list_contacts(&self, user_id: &str) -> Result<Vec<Contact>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, email, company, created_at FROM contacts
                 WHERE user_id = ?1 ORDER BY created_at DESC",
            )
            .map_err(|e| OutreachError::Persistence(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map([user_id], |row| {
                Ok(Contact {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    company: row.get(3)?,
                    created_at: parse_ts(&row.get::<_, String>(4)?),
                })
            })
            .map_err(|e| OutreachError::Persistence(format!("List contacts: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// The set of contact emails already known for a user.
    pub fn contact_emails(&self, user_id: &str) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT email FROM contacts WHERE user_id = ?1")
            .map_err(|e| OutreachError::Persistence(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))
            .map_err(|e| OutreachError::Persistence(format!("Contact emails: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Sender profile ──────────────────────────────────────

    /// Upsert the singleton profile for a user.
    pub fn put_profile(&self, user_id: &str, profile: &SenderProfile) -> Result<()> {
        let skills = serde_json::to_string(&profile.skills)
            .map_err(|e| OutreachError::Persistence(format!("Serialize skills: {e}")))?;
        let achievements = serde_json::to_string(&profile.achievements)
            .map_err(|e| OutreachError::Persistence(format!("Serialize achievements: {e}")))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO profiles
             (user_id, name, email, phone, profession, skills_json, experience,
              achievements_json, website, linkedin, github, twitter, photo_url, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                user_id,
                profile.name,
                profile.email,
                profile.phone,
                profile.profession,
                skills,
                profile.experience,
                achievements,
                profile.website,
                profile.linkedin,
                profile.github,
                profile.twitter,
                profile.photo_url,
                ts(Utc::now()),
            ],
        )
        .map_err(|e| OutreachError::Persistence(format!("Save profile: {e}")))?;
        Ok(())
    }

    /// Fetch a user's profile, if one has been saved.
    pub fn get_profile(&self, user_id: &str) -> Result<Option<SenderProfile>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT name, email, phone, profession, skills_json, experience,
                        achievements_json, website, linkedin, github, twitter, photo_url
                 FROM profiles WHERE user_id = ?1",
            )
            .map_err(|e| OutreachError::Persistence(format!("Prepare: {e}")))?;
        let mut rows = stmt
            .query_map([user_id], |row| {
                let skills_json: String = row.get(4)?;
                let achievements_json: String = row.get(6)?;
                Ok(SenderProfile {
                    name: row.get(0)?,
                    email: row.get(1)?,
                    phone: row.get(2)?,
                    profession: row.get(3)?,
                    skills: serde_json::from_str(&skills_json).unwrap_or_default(),
                    experience: row.get(5)?,
                    achievements: serde_json::from_str(&achievements_json).unwrap_or_default(),
                    website: row.get(7)?,
                    linkedin: row.get(8)?,
                    github: row.get(9)?,
                    twitter: row.get(10)?,
                    photo_url: row.get(11)?,
                })
            })
            .map_err(|e| OutreachError::Persistence(format!("Load profile: {e}")))?;
        Ok(rows.next().transpose().ok().flatten())
    }

    // ─── Scheduled-send queue ──────────────────────────────────────

    /// Persist a batch of scheduled emails in one transaction —
    /// all-or-nothing, so a rejected batch leaves zero records behind.
    pub fn schedule_batch(&self, emails: &[ScheduledEmail]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| OutreachError::Persistence(format!("Begin: {e}")))?;
        for e in emails {
            let attachments = serde_json::to_string(&e.attachments)
                .map_err(|err| OutreachError::Persistence(format!("Serialize attachments: {err}")))?;
            tx.execute(
                "INSERT INTO scheduled_emails
                 (id, user_id, to_addr, subject, html, attachments_json, from_name,
                  name, company, template, send_at, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    e.id,
                    e.user_id,
                    e.to,
                    e.subject,
                    e.html,
                    attachments,
                    e.from_name,
                    e.name,
                    e.company,
                    e.template,
                    ts(e.send_at),
                    e.status,
                    ts(e.created_at),
                ],
            )
            .map_err(|err| OutreachError::Persistence(format!("Schedule email: {err}")))?;
        }
        tx.commit()
            .map_err(|e| OutreachError::Persistence(format!("Commit schedule: {e}")))?;
        Ok(())
    }

    /// Due items across every user: `send_at <= now`, earliest first,
    /// id descending as the deterministic tie-break.
    pub fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledEmail>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, to_addr, subject, html, attachments_json, from_name,
                        name, company, template, send_at, status, created_at
                 FROM scheduled_emails
                 WHERE send_at <= ?1
                 ORDER BY send_at ASC, id DESC",
            )
            .map_err(|e| OutreachError::Persistence(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map([ts(now)], map_scheduled)
            .map_err(|e| OutreachError::Persistence(format!("Due query: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// A user's pending queue, soonest first.
    pub fn list_scheduled(&self, user_id: &str) -> Result<Vec<ScheduledEmail>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, to_addr, subject, html, attachments_json, from_name,
                        name, company, template, send_at, status, created_at
                 FROM scheduled_emails
                 WHERE user_id = ?1 ORDER BY send_at ASC",
            )
            .map_err(|e| OutreachError::Persistence(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map([user_id], map_scheduled)
            .map_err(|e| OutreachError::Persistence(format!("List scheduled: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── History ledger ──────────────────────────────────────

    /// Append ledger entries in one transaction.
    pub fn insert_history(&self, records: &[HistoryRecord]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| OutreachError::Persistence(format!("Begin: {e}")))?;
        for r in records {
            insert_history_record(&tx, r)?;
        }
        tx.commit()
            .map_err(|e| OutreachError::Persistence(format!("Commit history: {e}")))?;
        Ok(())
    }

    /// Commit one campaign's bookkeeping atomically: new ledger entries
    /// plus follow-up status transitions on existing ones.
    pub fn commit_campaign(
        &self,
        inserts: &[HistoryRecord],
        follow_ups: &[(String, DateTime<Utc>)],
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| OutreachError::Persistence(format!("Begin: {e}")))?;
        for r in inserts {
            insert_history_record(&tx, r)?;
        }
        for (id, sent_at) in follow_ups {
            let changed = tx
                .execute(
                    "UPDATE history SET status = ?1, sent_at = ?2 WHERE id = ?3",
                    params![OutreachStatus::FollowUpSent.as_str(), ts(*sent_at), id],
                )
                .map_err(|e| OutreachError::Persistence(format!("Follow-up update: {e}")))?;
            if changed == 0 {
                tracing::warn!("⚠️ Follow-up target {id} not found in history");
            }
        }
        tx.commit()
            .map_err(|e| OutreachError::Persistence(format!("Commit campaign: {e}")))?;
        Ok(())
    }

    /// One dispatcher run's bookkeeping: relocate sent items into
    /// history and delete processed queue entries, all-or-nothing.
    pub fn finalize_run(&self, relocated: &[HistoryRecord], delete_ids: &[String]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| OutreachError::Persistence(format!("Begin: {e}")))?;
        for r in relocated {
            insert_history_record(&tx, r)?;
        }
        for id in delete_ids {
            tx.execute("DELETE FROM scheduled_emails WHERE id = ?1", [id])
                .map_err(|e| OutreachError::Persistence(format!("Delete scheduled: {e}")))?;
        }
        tx.commit()
            .map_err(|e| OutreachError::Persistence(format!("Commit run: {e}")))?;
        Ok(())
    }

    /// A user's ledger, newest first.
    pub fn list_history(&self, user_id: &str) -> Result<Vec<HistoryRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, name, email, company, template, status,
                        sent_at, created_at, follow_up_for
                 FROM history WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| OutreachError::Persistence(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map([user_id], map_history)
            .map_err(|e| OutreachError::Persistence(format!("List history: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Look up one ledger entry.
    pub fn get_history(&self, user_id: &str, id: &str) -> Result<Option<HistoryRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, name, email, company, template, status,
                        sent_at, created_at, follow_up_for
                 FROM history WHERE user_id = ?1 AND id = ?2",
            )
            .map_err(|e| OutreachError::Persistence(format!("Prepare: {e}")))?;
        let mut rows = stmt
            .query_map(params![user_id, id], map_history)
            .map_err(|e| OutreachError::Persistence(format!("Get history: {e}")))?;
        Ok(rows.next().transpose().ok().flatten())
    }
}

fn insert_history_record(tx: &rusqlite::Transaction<'_>, r: &HistoryRecord) -> Result<()> {
    tx.execute(
        "INSERT INTO history
         (id, user_id, name, email, company, template, status, sent_at, created_at, follow_up_for)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            r.id,
            r.user_id,
            r.name,
            r.email,
            r.company,
            r.template,
            r.status.as_str(),
            ts(r.sent_at),
            ts(r.created_at),
            r.follow_up_for,
        ],
    )
    .map_err(|e| OutreachError::Persistence(format!("Insert history: {e}")))?;
    Ok(())
}

fn map_scheduled(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledEmail> {
    let attachments_json: String = row.get(5)?;
    Ok(ScheduledEmail {
        id: row.get(0)?,
        user_id: row.get(1)?,
        to: row.get(2)?,
        subject: row.get(3)?,
        html: row.get(4)?,
        attachments: serde_json::from_str(&attachments_json).unwrap_or_default(),
        from_name: row.get(6)?,
        name: row.get(7)?,
        company: row.get(8)?,
        template: row.get(9)?,
        send_at: parse_ts(&row.get::<_, String>(10)?),
        status: row.get(11)?,
        created_at: parse_ts(&row.get::<_, String>(12)?),
    })
}

fn map_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let status: String = row.get(6)?;
    Ok(HistoryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        company: row.get(4)?,
        template: row.get(5)?,
        status: OutreachStatus::parse(&status),
        sent_at: parse_ts(&row.get::<_, String>(7)?),
        created_at: parse_ts(&row.get::<_, String>(8)?),
        follow_up_for: row.get(9)?,
    })
}

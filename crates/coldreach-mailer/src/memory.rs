//! In-memory mailer — records every send instead of delivering it.
//! Used by tests and dry-run wiring; failure injection per address
//! exercises the settle-all and retry paths.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use coldreach_core::error::{OutreachError, Result};

use crate::{Mailer, OutgoingEmail};

/// Mailer that keeps sent emails in a buffer.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `address` fail with a delivery error.
    pub fn fail_address(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    /// Clear failure injection, e.g. to simulate a relay recovering.
    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(OutreachError::Delivery(format!(
                "simulated relay failure for {}",
                email.to
            )));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sends_and_injects_failures() {
        let mailer = MemoryMailer::new();
        mailer.fail_address("down@example.com");

        let ok = OutgoingEmail {
            from_name: "Sam".into(),
            to: "up@example.com".into(),
            subject: "s".into(),
            html: "<p>x</p>".into(),
            attachments: vec![],
        };
        let bad = OutgoingEmail {
            to: "down@example.com".into(),
            ..ok.clone()
        };

        assert!(mailer.send(&ok).await.is_ok());
        assert!(mailer.send(&bad).await.is_err());
        assert_eq!(mailer.sent_count(), 1);

        mailer.heal();
        assert!(mailer.send(&bad).await.is_ok());
        assert_eq!(mailer.sent_count(), 2);
    }
}

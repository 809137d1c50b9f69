//! SMTP delivery — async lettre over a STARTTLS relay.

use async_trait::async_trait;
use coldreach_core::config::SmtpConfig;
use coldreach_core::error::{OutreachError, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{Mailer, OutgoingEmail};

/// SMTP relay mailer. The transport is built once; every send reuses
/// the pooled connection.
pub struct SmtpMailer {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        if config.email.is_empty() || config.password.is_empty() {
            return Err(OutreachError::Config(
                "SMTP relay credentials are not configured".into(),
            ));
        }
        let creds = Credentials::new(config.email.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| OutreachError::Config(format!("SMTP relay: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();
        Ok(Self { config, transport })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        let from_name = if email.from_name.is_empty() {
            &self.config.from_name
        } else {
            &email.from_name
        };
        let from: Mailbox = format!("{from_name} <{}>", self.config.email)
            .parse()
            .map_err(|e| OutreachError::Delivery(format!("Invalid from: {e}")))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| OutreachError::Delivery(format!("Invalid to: {e}")))?;

        let mut multipart = MultiPart::mixed().singlepart(SinglePart::html(email.html.clone()));
        for att in &email.attachments {
            let content_type = ContentType::parse(&att.content_type)
                .or_else(|_| ContentType::parse("application/octet-stream"))
                .map_err(|e| OutreachError::Delivery(format!("Attachment type: {e}")))?;
            multipart = multipart.singlepart(
                Attachment::new(att.filename.clone()).body(att.content.clone(), content_type),
            );
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .multipart(multipart)
            .map_err(|e| OutreachError::Delivery(format!("Build email: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| OutreachError::Delivery(format!("SMTP send: {e}")))?;
        tracing::info!("📤 Email sent to: {}", email.to);
        Ok(())
    }
}

//! # Coldreach Core
//!
//! Shared foundation for the Coldreach workspace: configuration,
//! the error taxonomy, and the domain data model (contacts, sender
//! profile, templates, scheduled emails, history records).
//!
//! Everything here is plain data — no IO, no network. The collaborators
//! that move data around live in the other crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::OutreachConfig;
pub use error::{OutreachError, Result};
pub use types::{
    Contact, EmailAttachment, EmailTemplate, HistoryRecord, OutreachStatus, ScheduledEmail,
    SenderProfile,
};

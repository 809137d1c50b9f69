//! Error taxonomy shared across the workspace.
//!
//! The variants map directly onto user-visible behavior: validation and
//! auth failures abort an operation with no side effects, delivery
//! failures are aggregated per recipient, persistence failures surface
//! as a 500 at the HTTP boundary.

use thiserror::Error;

/// Workspace-wide error type.
#[derive(Debug, Error)]
pub enum OutreachError {
    /// Bad or missing input. No side effects were performed.
    #[error("{0}")]
    Validation(String),

    /// Missing or mismatched shared secret. No side effects were performed.
    #[error("unauthorized: {0}")]
    Auth(String),

    /// A single recipient's send failed. Carries a human-readable reason.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// A storage read or write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Config file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The AI rephrasing call failed.
    #[error("rewrite failed: {0}")]
    Rewrite(String),

    /// A referenced record or artifact does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OutreachError>;

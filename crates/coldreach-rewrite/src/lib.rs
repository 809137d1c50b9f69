//! # Coldreach Rewrite
//!
//! The AI copywriting integration, modeled as an opaque capability:
//! `improve(text) -> text | failure`. The rest of the system only sees
//! the [`Rewriter`] trait; swapping the backing model changes nothing
//! upstream.
//!
//! Merge tokens are protected across the call — the model receives
//! opaque placeholders it has no reason to touch, and they are restored
//! afterwards. Returned HTML is sanitized before it reaches a template.

pub mod gemini;
pub mod guard;

use async_trait::async_trait;
use coldreach_core::error::Result;

pub use gemini::GeminiRewriter;

/// Opaque "rewrite this text" capability.
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn improve(&self, text: &str) -> Result<String>;
}

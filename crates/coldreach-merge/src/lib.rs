//! # Coldreach Merge
//!
//! The merge-token engine: a pure function from (template, recipient,
//! sender profile) to a personalized subject and HTML body.
//!
//! ## Design
//! - Tokens are an enumerated lookup table of token → extractor, so
//!   coverage is provable — no ad-hoc replace chains.
//! - Substitution is case-insensitive, global per token, and idempotent
//!   once no tokens remain.
//! - The signature block is synthesized from profile fields and spliced
//!   at the `[Footer]` token (or appended when the token is absent);
//!   any pre-existing signature is stripped first, so re-personalizing
//!   an edited body never duplicates it.
//! - Never blocks, never errors: unresolved tokens degrade to safe
//!   defaults instead of leaking into sent mail.

pub mod personalize;
pub mod signature;
pub mod tokens;

pub use personalize::{Personalized, personalize};
pub use signature::{build_signature, has_signature, strip_signature};
pub use tokens::MergeToken;

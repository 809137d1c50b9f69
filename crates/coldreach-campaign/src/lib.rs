//! # Coldreach Campaign
//!
//! The campaign pipeline: orchestrator, scheduled-send write path, and
//! the dispatcher that promotes due scheduled emails into sent history.
//!
//! ## Architecture
//! ```text
//! Orchestrator (user-initiated)
//!   ├── personalize every recipient (merge engine)
//!   ├── fan out sends, settle all — one failure never blocks the rest
//!   └── commit successes to History in one batch
//!
//! Schedule write path
//!   └── validate the whole batch → queue entries (all-or-nothing)
//!
//! Dispatcher (cron-triggered)
//!   ├── query due items across all users (send_at ASC, id DESC)
//!   ├── discard malformed records, send valid ones in order
//!   ├── failures stay queued for the next run
//!   └── relocate successes into History + delete, one transaction
//! ```

pub mod dispatcher;
pub mod orchestrator;
pub mod schedule;
pub mod templates;

pub use dispatcher::{DispatchReport, run_dispatch};
pub use orchestrator::{CampaignRecipient, CampaignReport, Orchestrator, SendFailure, SendOptions};
pub use schedule::{ScheduleEmailRequest, schedule_emails};

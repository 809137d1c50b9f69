//! # Coldreach Gateway
//!
//! The HTTP surface: dispatcher trigger (bearer-secret protected),
//! campaign enqueue, campaign send, and the CRUD glue routes the UI
//! consumes (contacts, history, profile, resume, templates, rewrite).

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};

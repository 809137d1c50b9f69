//! HTTP server implementation using Axum.

use std::path::Path;
use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use coldreach_core::OutreachConfig;
use coldreach_mailer::{Mailer, MemoryMailer, SmtpMailer};
use coldreach_rewrite::{GeminiRewriter, Rewriter};
use coldreach_store::{OutreachDb, ResumeStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
pub struct AppState {
    pub config: OutreachConfig,
    pub db: Arc<OutreachDb>,
    pub resumes: Arc<ResumeStore>,
    pub mailer: Arc<dyn Mailer>,
    /// Optional — routes answer 503 when no rewriter is configured.
    pub rewriter: Option<Arc<dyn Rewriter>>,
    /// Non-blocking lease around dispatcher runs: a second trigger while
    /// one is in flight is refused instead of risking a double send.
    pub dispatch_lease: tokio::sync::Mutex<()>,
    pub start_time: std::time::Instant,
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/api/v1/info", get(super::routes::system_info))
        // Dispatcher trigger — bearer-secret protected inside the handler.
        .route("/api/v1/cron/dispatch", post(super::routes::cron_dispatch))
        // Campaign surfaces
        .route("/api/v1/schedule", post(super::routes::schedule_emails))
        .route("/api/v1/campaigns/send", post(super::routes::send_campaign))
        // Per-user collections
        .route(
            "/api/v1/users/{user_id}/contacts",
            get(super::routes::list_contacts).post(super::routes::add_contact),
        )
        .route("/api/v1/users/{user_id}/history", get(super::routes::list_history))
        .route("/api/v1/users/{user_id}/scheduled", get(super::routes::list_scheduled))
        .route(
            "/api/v1/users/{user_id}/profile",
            get(super::routes::get_profile).put(super::routes::put_profile),
        )
        .route(
            "/api/v1/users/{user_id}/resume",
            put(super::routes::put_resume).get(super::routes::get_resume),
        )
        // Templates + rewrite capability
        .route("/api/v1/templates", get(super::routes::list_templates))
        .route("/api/v1/rewrite", post(super::routes::rewrite_text))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start(config: OutreachConfig) -> anyhow::Result<()> {
    let db_path = shellexpand::tilde(&config.storage.db_path).to_string();
    if let Some(parent) = Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Arc::new(OutreachDb::open(Path::new(&db_path))?);
    tracing::info!("💾 Outreach DB ready: {db_path}");

    let resume_dir = shellexpand::tilde(&config.storage.resume_dir).to_string();
    let resumes = Arc::new(ResumeStore::new(Path::new(&resume_dir)));

    // Without relay credentials we still come up, but nothing leaves the
    // process — sends land in the in-memory buffer.
    let mailer: Arc<dyn Mailer> = match SmtpMailer::new(config.smtp.clone()) {
        Ok(m) => {
            tracing::info!("📧 SMTP relay configured: {}", config.smtp.host);
            Arc::new(m)
        }
        Err(e) => {
            tracing::warn!("⚠️ {e} — running with in-memory mailer, emails will NOT be delivered");
            Arc::new(MemoryMailer::new())
        }
    };

    let rewriter: Option<Arc<dyn Rewriter>> = if config.rewrite.enabled {
        match GeminiRewriter::new(config.rewrite.clone()) {
            Ok(r) => Some(Arc::new(r)),
            Err(e) => {
                tracing::warn!("⚠️ Rewrite capability unavailable: {e}");
                None
            }
        }
    } else {
        None
    };

    if config.gateway.cron_secret.is_empty() {
        tracing::warn!("⚠️ gateway.cron_secret is empty — the dispatch endpoint will reject all calls");
    }

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(AppState {
        config,
        db,
        resumes,
        mailer,
        rewriter,
        dispatch_lease: tokio::sync::Mutex::new(()),
        start_time: std::time::Instant::now(),
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

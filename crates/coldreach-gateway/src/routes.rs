//! API route handlers for the gateway.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use coldreach_campaign::{
    CampaignRecipient, Orchestrator, ScheduleEmailRequest, SendOptions, run_dispatch, schedule_emails as schedule_batch, templates,
};
use coldreach_core::error::OutreachError;
use coldreach_core::types::{Contact, EmailTemplate, SenderProfile};
use serde::Deserialize;

use super::server::AppState;

type ApiResponse = (StatusCode, Json<serde_json::Value>);

fn ok(value: serde_json::Value) -> ApiResponse {
    (StatusCode::OK, Json(value))
}

/// Map a pipeline error onto the HTTP taxonomy.
fn error_response(e: &OutreachError) -> ApiResponse {
    let status = match e {
        OutreachError::Validation(_) => StatusCode::BAD_REQUEST,
        OutreachError::Auth(_) => StatusCode::UNAUTHORIZED,
        OutreachError::NotFound(_) => StatusCode::NOT_FOUND,
        OutreachError::Rewrite(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "coldreach-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "gateway": {
            "host": state.config.gateway.host,
            "port": state.config.gateway.port,
        },
        "rewrite_enabled": state.rewriter.is_some(),
    }))
}

// ─── Dispatcher trigger ──────────────────────────────────────

/// Run one dispatch pass. Requires `Authorization: Bearer <cron_secret>`;
/// the whole run is rejected before touching data otherwise.
pub async fn cron_dispatch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResponse {
    let secret = &state.config.gateway.cron_secret;
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if secret.is_empty() || presented != format!("Bearer {secret}") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Unauthorized" })),
        );
    }

    // One run at a time: overlapping triggers could double-send a due
    // item, so a second caller is refused outright.
    let Ok(_lease) = state.dispatch_lease.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "A dispatch run is already in progress." })),
        );
    };

    match run_dispatch(&state.db, state.mailer.as_ref(), Utc::now()).await {
        Ok(report) => ok(serde_json::json!({
            "ok": true,
            "message": report.message(),
            "sent": report.sent,
            "discarded": report.discarded,
            "retained": report.retained,
        })),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": "An error occurred during the cron job.",
                "details": e.to_string(),
            })),
        ),
    }
}

// ─── Campaign surfaces ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub emails: Vec<ScheduleEmailRequest>,
}

/// Enqueue a batch of scheduled emails. The whole batch is rejected on
/// any invalid input — zero records persisted.
pub async fn schedule_emails(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScheduleBody>,
) -> ApiResponse {
    match schedule_batch(&state.db, &body.user_id, &body.emails) {
        Ok(count) => ok(serde_json::json!({
            "ok": true,
            "message": format!("{count} emails scheduled successfully."),
            "count": count,
        })),
        Err(e @ OutreachError::Validation(_)) => error_response(&e),
        Err(e) => {
            tracing::error!("❌ Error scheduling emails: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to schedule emails." })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendCampaignBody {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub recipients: Vec<CampaignRecipient>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template: Option<EmailTemplate>,
    #[serde(default)]
    pub is_follow_up: bool,
    #[serde(default)]
    pub is_test: bool,
}

/// Run a campaign: personalize, fan out, settle all, report
/// "X of Y processed" with per-recipient failures.
pub async fn send_campaign(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendCampaignBody>,
) -> ApiResponse {
    if body.user_id.is_empty() {
        return error_response(&OutreachError::Validation("Missing user ID.".into()));
    }
    let template = match body.template.or_else(|| {
        body.template_id.as_deref().and_then(templates::by_id)
    }) {
        Some(t) => t,
        None => {
            return error_response(&OutreachError::Validation(
                "Unknown or missing template.".into(),
            ));
        }
    };

    let orchestrator = Orchestrator::new(
        Arc::clone(&state.db),
        Arc::clone(&state.resumes),
        Arc::clone(&state.mailer),
    );
    let opts = SendOptions {
        is_follow_up: body.is_follow_up,
        is_test: body.is_test,
    };
    match orchestrator
        .initiate(&body.user_id, &body.recipients, &template, opts)
        .await
    {
        Ok(report) => ok(serde_json::json!({
            "ok": true,
            "message": report.summary(),
            "total": report.total,
            "processed": report.processed,
            "failures": report.failures,
        })),
        Err(e) => error_response(&e),
    }
}

// ─── Per-user collections ──────────────────────────────────────

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    match state.db.list_contacts(&user_id) {
        Ok(contacts) => ok(serde_json::json!({ "ok": true, "contacts": contacts })),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct NewContactBody {
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
}

pub async fn add_contact(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(body): Json<NewContactBody>,
) -> ApiResponse {
    if body.email.is_empty() {
        return error_response(&OutreachError::Validation("Contact email is required.".into()));
    }
    let contact = Contact::new(&body.name, &body.email, &body.company);
    match state.db.insert_contacts(&user_id, &[contact.clone()]) {
        Ok(()) => ok(serde_json::json!({ "ok": true, "id": contact.id })),
        Err(e) => error_response(&e),
    }
}

pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    match state.db.list_history(&user_id) {
        Ok(history) => ok(serde_json::json!({ "ok": true, "history": history })),
        Err(e) => error_response(&e),
    }
}

pub async fn list_scheduled(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    match state.db.list_scheduled(&user_id) {
        Ok(scheduled) => ok(serde_json::json!({ "ok": true, "scheduled": scheduled })),
        Err(e) => error_response(&e),
    }
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    match state.db.get_profile(&user_id) {
        Ok(profile) => ok(serde_json::json!({ "ok": true, "profile": profile })),
        Err(e) => error_response(&e),
    }
}

pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(profile): Json<SenderProfile>,
) -> ApiResponse {
    match state.db.put_profile(&user_id, &profile) {
        Ok(()) => ok(serde_json::json!({ "ok": true })),
        Err(e) => error_response(&e),
    }
}

pub async fn put_resume(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> ApiResponse {
    if body.is_empty() {
        return error_response(&OutreachError::Validation("Empty resume upload.".into()));
    }
    match state.resumes.save(&user_id, &body) {
        Ok(()) => ok(serde_json::json!({ "ok": true, "size": body.len() })),
        Err(e) => error_response(&e),
    }
}

pub async fn get_resume(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    ok(serde_json::json!({
        "ok": true,
        "exists": state.resumes.exists(&user_id),
        "size": state.resumes.size(&user_id),
    }))
}

// ─── Templates + rewrite ──────────────────────────────────────

pub async fn list_templates() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "templates": templates::catalog() }))
}

#[derive(Debug, Deserialize)]
pub struct RewriteBody {
    pub text: String,
}

/// Rephrase template text via the configured rewriter.
pub async fn rewrite_text(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RewriteBody>,
) -> ApiResponse {
    let Some(rewriter) = &state.rewriter else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "Rewrite capability is not configured." })),
        );
    };
    match rewriter.improve(&body.text).await {
        Ok(text) => ok(serde_json::json!({ "ok": true, "text": text })),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use coldreach_core::OutreachConfig;
    use coldreach_mailer::MemoryMailer;
    use coldreach_store::{OutreachDb, ResumeStore};
    use tower::ServiceExt;

    fn test_state(name: &str) -> (Arc<AppState>, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("coldreach-gw-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).ok();
        let mut config = OutreachConfig::default();
        config.gateway.cron_secret = "s3cret".into();
        let state = Arc::new(AppState {
            config,
            db: Arc::new(OutreachDb::open(&dir.join("test.db")).unwrap()),
            resumes: Arc::new(ResumeStore::new(&dir.join("resumes"))),
            mailer: Arc::new(MemoryMailer::new()),
            rewriter: None,
            dispatch_lease: tokio::sync::Mutex::new(()),
            start_time: std::time::Instant::now(),
        });
        (state, dir)
    }

    #[tokio::test]
    async fn test_dispatch_requires_bearer_secret() {
        let (state, dir) = test_state("auth");
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/cron/dispatch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/cron/dispatch")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Correct secret, nothing due: a 200 no-op.
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/cron/dispatch")
                    .header("authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_schedule_validates_input() {
        let (state, dir) = test_state("schedule");
        let db = Arc::clone(&state.db);
        let app = build_router(state);

        // Empty emails array → 400.
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"user_id":"u1","emails":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Bad send_at anywhere in the batch → 400, nothing persisted.
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"user_id":"u1","emails":[
                            {"to":"a@x.io","subject":"s","html":"<p>x</p>"},
                            {"to":"b@x.io","subject":"s","html":"<p>x</p>","send_at":"garbage"}
                        ]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(db.list_scheduled("u1").unwrap().is_empty());

        // Well-formed batch → 200.
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"user_id":"u1","emails":[{"to":"a@x.io","subject":"s","html":"<p>x</p>"}]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(db.list_scheduled("u1").unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_rewrite_unconfigured_is_503() {
        let (state, dir) = test_state("rewrite");
        let app = build_router(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/rewrite")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"<p>hi</p>"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        std::fs::remove_dir_all(&dir).ok();
    }
}

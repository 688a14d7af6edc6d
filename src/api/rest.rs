// =============================================================================
// REST API Endpoints: Axum 0.8
// =============================================================================
//
// All endpoints live under `/api/v1/`.  Health and the dashboard snapshot are
// public; the error log and manual refresh require a Bearer token.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/dashboard", get(dashboard))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/errors", get(recent_errors))
        .route("/api/v1/refresh", post(refresh))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// =============================================================================
// Dashboard (public)
// =============================================================================

async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.latest_snapshot() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "No refresh cycle has completed yet" })),
        )
            .into_response(),
    }
}

// =============================================================================
// Errors (authenticated)
// =============================================================================

async fn recent_errors(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.recent_errors.read().clone())
}

// =============================================================================
// Manual refresh (authenticated)
// =============================================================================

async fn refresh(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state.refresh().await;
    info!(run_id = %outcome.run_id, "manual refresh completed");
    Json(outcome)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::dashboard::fixtures::full_snapshot;
    use crate::runtime_config::RuntimeConfig;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_version() {
        let state = Arc::new(AppState::new(RuntimeConfig::default()));
        state.publish(full_snapshot());

        let (status, body) = get_json(router(state), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["state_version"], 1);
    }

    #[tokio::test]
    async fn dashboard_unavailable_before_first_cycle() {
        let state = Arc::new(AppState::new(RuntimeConfig::default()));
        let (status, body) = get_json(router(state), "/api/v1/dashboard").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn dashboard_serves_latest_snapshot() {
        let state = Arc::new(AppState::new(RuntimeConfig::default()));
        state.publish(full_snapshot());

        let (status, body) = get_json(router(state), "/api/v1/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sentiment"]["status"], "ready");
        assert_eq!(body["sentiment"]["data"]["max_pain_strike"], 200.0);
        assert_eq!(body["option_chain"]["data"]["rows"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn refresh_requires_authorization_header() {
        let state = Arc::new(AppState::new(RuntimeConfig::default()));
        let resp = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(resp.status().is_client_error());
        assert_eq!(state.current_state_version(), 0);
    }
}

use super::state::AppState;
use crate::session::{StartOutcome, StopOutcome};
use crate::stream::StreamLocator;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::info;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    /// "streaming", "ignored" or "failed"
    pub outcome: String,
    pub locator: Option<StreamLocator>,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    /// "stopped", "already_idle" or "ignored"
    pub outcome: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub cleared: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Open the event channel and start the video feed
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start requested over HTTP");

    match state.controller.start().await {
        StartOutcome::Streaming(locator) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                outcome: "streaming".to_string(),
                locator: Some(locator),
            }),
        ),
        StartOutcome::Ignored => (
            StatusCode::CONFLICT,
            Json(StartSessionResponse {
                outcome: "ignored".to_string(),
                locator: None,
            }),
        ),
        StartOutcome::Failed => (
            StatusCode::BAD_GATEWAY,
            Json(StartSessionResponse {
                outcome: "failed".to_string(),
                locator: None,
            }),
        ),
    }
}

/// POST /session/stop
/// Stop the video feed and close the event channel
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested over HTTP");

    let (status, outcome) = match state.controller.stop().await {
        StopOutcome::Stopped => (StatusCode::OK, "stopped"),
        StopOutcome::AlreadyIdle => (StatusCode::OK, "already_idle"),
        StopOutcome::Ignored => (StatusCode::CONFLICT, "ignored"),
    };

    (
        status,
        Json(StopSessionResponse {
            outcome: outcome.to_string(),
        }),
    )
}

/// POST /announcements/reset
/// Forget announced names
pub async fn reset_announcements(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.controller.reset_announcements().await;
    (StatusCode::OK, Json(ResetResponse { cleared }))
}

/// GET /session/status
/// Get status of the session
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.controller.status().await;
    (StatusCode::OK, Json(status))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

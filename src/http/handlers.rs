use super::state::AppState;
use crate::error::EngineError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ReconnectResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.engine.snapshot()))
}

/// POST /recording/start
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.start_recording().await {
        Ok(session_id) => {
            info!("Recording started via API: {}", session_id);
            (
                StatusCode::OK,
                Json(StartRecordingResponse {
                    session_id,
                    status: "recording".to_string(),
                }),
            )
                .into_response()
        }
        Err(e @ EngineError::AlreadyRecording { .. }) => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e @ EngineError::NotConnected { .. }) => {
            warn!("Recording start rejected: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /recording/stop
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.stop_recording().await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /connection/reconnect
pub async fn force_reconnect(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.force_reconnect().await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ReconnectResponse {
                status: "reconnecting".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

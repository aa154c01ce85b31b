use super::state::AppState;
use crate::error::SessionError;
use crate::session::{SessionCoordinator, SessionSnapshot};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Connect timeout applied when a start request does not set one
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Optional endpoint overriding the configured one
    pub endpoint: Option<String>,

    /// Connect timeout in seconds (default: 10)
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkAcceptedResponse {
    pub session_id: String,
    pub sent_count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct FinalizeParams {
    /// Give up waiting after this many seconds (default: wait indefinitely)
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub status: String,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn session_error_response(err: &SessionError) -> Response {
    let status = match err {
        SessionError::MissingEndpoint => StatusCode::BAD_REQUEST,
        SessionError::NotConnected | SessionError::WorkerUnavailable => StatusCode::CONFLICT,
        SessionError::Connect(_) | SessionError::WorkerGone => StatusCode::BAD_GATEWAY,
        SessionError::DeadlineElapsed(_) => StatusCode::GATEWAY_TIMEOUT,
        SessionError::WorkerInit(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn not_found(session_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Session {} not found", session_id),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Create a session and connect it to the transcription server
pub async fn start_session(
    State(state): State<AppState>,
    req: Option<Json<StartSessionRequest>>,
) -> Response {
    let req = req.map(|Json(req)| req).unwrap_or_default();

    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));
    let endpoint = req
        .endpoint
        .unwrap_or_else(|| state.default_endpoint.clone());
    let connect_timeout =
        Duration::from_secs(req.connect_timeout_secs.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS));

    info!("Starting session {} against {}", session_id, endpoint);

    if state.sessions.read().await.contains_key(&session_id) {
        return error_response(
            StatusCode::CONFLICT,
            format!("Session {} already exists", session_id),
        );
    }

    let session = Arc::new(SessionCoordinator::new(Arc::clone(&state.transport)));

    if let Err(e) = session.connect_with_deadline(&endpoint, connect_timeout).await {
        error!("Failed to start session {}: {}", session_id, e);
        session.cleanup();
        return session_error_response(&e);
    }

    {
        let mut sessions = state.sessions.write().await;
        if sessions.contains_key(&session_id) {
            session.cleanup();
            return error_response(
                StatusCode::CONFLICT,
                format!("Session {} already exists", session_id),
            );
        }
        sessions.insert(session_id.clone(), session);
    }

    info!("Session {} connected", session_id);

    (
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id: session_id.clone(),
            status: "connected".to_string(),
            message: format!("Session {} connected to {}", session_id, endpoint),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/chunks
/// Forward the raw request body as one audio chunk
pub async fn send_chunk(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Response {
    let Some(session) = state.session(&session_id).await else {
        return not_found(&session_id);
    };

    match session.send_chunk(body.to_vec()) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ChunkAcceptedResponse {
                session_id,
                sent_count: session.snapshot().sent_count,
            }),
        )
            .into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// POST /sessions/:session_id/finalize
/// Wait for every outstanding result, then disconnect
pub async fn finalize_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<FinalizeParams>,
) -> Response {
    let Some(session) = state.session(&session_id).await else {
        return not_found(&session_id);
    };

    info!("Finalizing session {}", session_id);

    let result = match params.deadline_secs {
        Some(secs) => session.finalize_with_deadline(Duration::from_secs(secs)).await,
        None => session.finalize().await,
    };

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(SessionResponse {
                session_id,
                status: "finalized".to_string(),
                snapshot: session.snapshot(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to finalize session {}: {}", session_id, e);
            session_error_response(&e)
        }
    }
}

/// DELETE /sessions/:session_id
/// Tear the session down and return its final state
pub async fn cleanup_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    let Some(session) = session else {
        return not_found(&session_id);
    };

    let snapshot = session.snapshot();
    session.cleanup();
    info!("Session {} cleaned up", session_id);

    (
        StatusCode::OK,
        Json(SessionResponse {
            session_id,
            status: "closed".to_string(),
            snapshot,
        }),
    )
        .into_response()
}

/// GET /sessions/:session_id/status
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.session(&session_id).await {
        Some(session) => (StatusCode::OK, Json(session.snapshot())).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/transcript
/// Transcript fragments accumulated so far, in arrival order
pub async fn get_session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.session(&session_id).await {
        Some(session) => (StatusCode::OK, Json(session.transcript())).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

//! Session endpoints: chunk ingest, reset, status
//!
//! Handlers only validate and enqueue; the session task owns all
//! state mutation, which keeps chunk processing strictly sequential
//! even under concurrent HTTP clients.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use candor_common::types::{SpeakerRole, TranscriptChunk};

use crate::error::{ApiError, ApiResult};
use crate::services::{SessionCommand, SessionSnapshot};
use crate::AppState;

/// Inbound transcript chunk
#[derive(Debug, Deserialize)]
pub struct ChunkRequest {
    /// Transcribed utterance text
    pub text: String,
    /// Speaker role (defaults to candidate)
    #[serde(default)]
    pub speaker: SpeakerRole,
    /// Capture timestamp, if known
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// POST /session/chunk
///
/// Accepts one diarized utterance. Blank text is rejected before it
/// reaches the pipeline; accepted chunks are queued for the session
/// task and processed in arrival order.
pub async fn submit_chunk(
    State(state): State<AppState>,
    Json(request): Json<ChunkRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "transcript chunk text must not be blank".to_string(),
        ));
    }

    let chunk = TranscriptChunk {
        text: request.text,
        speaker: request.speaker,
        timestamp: request.timestamp,
    };

    state
        .commands
        .send(SessionCommand::Chunk(chunk))
        .await
        .map_err(|_| ApiError::Internal("session task is not running".to_string()))?;

    Ok(Json(json!({"status": "accepted"})))
}

/// POST /session/reset
pub async fn reset_session(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    state
        .commands
        .send(SessionCommand::Reset)
        .await
        .map_err(|_| ApiError::Internal("session task is not running".to_string()))?;

    Ok(Json(json!({"status": "reset"})))
}

/// GET /session/status
pub async fn session_status(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.snapshot.read().await.clone())
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/session/chunk", post(submit_chunk))
        .route("/session/reset", post(reset_session))
        .route("/session/status", get(session_status))
}

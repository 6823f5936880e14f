//! Session endpoints and the turn endpoints (streaming and aggregated).

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use maestro_core::StreamEvent;

use crate::error::AppError;
use crate::types::{
    CleanupResponse, CreateSessionResponse, MessageRequest, MessageResponse, SessionSummary,
    SettingsRequest, SupervisorQuery, SupervisorStatus,
};
use crate::{session_turn_lock, AppState};

const STREAM_CHANNEL_BUFFER: usize = 256;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/cleanup", post(cleanup))
        .route("/:id", get(get_session))
        .route("/:id/settings", post(update_settings))
        .route("/:id/supervisor", post(toggle_supervisor).get(supervisor_status))
        .route("/:id/message", post(message))
        .route("/:id/message/stream", post(message_stream))
}

/// List sessions that have at least one message or one enabled agent.
async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let sessions = state.store.list()?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let doc = state.store.create().await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id: doc.id,
            created_at: doc.created_at.to_rfc3339(),
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<maestro_core::SessionDoc>, AppError> {
    let doc = state
        .store
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    Ok(Json(doc))
}

/// Update the manual plan and supervisor flag (read-modify-write).
async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut doc = state
        .store
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    doc.agent_sequence = req.agent_sequence;
    doc.supervisor_mode = req.supervisor_mode;
    state.store.put(&id, &doc).await?;
    Ok(Json(json!({"ok": true})))
}

async fn toggle_supervisor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SupervisorQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut doc = state
        .store
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    doc.supervisor_mode = query.enabled;
    state.store.put(&id, &doc).await?;
    Ok(Json(json!({
        "supervisor_mode": query.enabled,
        "message": format!(
            "Supervisor mode {} for chat {id}",
            if query.enabled { "enabled" } else { "disabled" }
        ),
    })))
}

async fn supervisor_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SupervisorStatus>, AppError> {
    let doc = state
        .store
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    Ok(Json(SupervisorStatus {
        supervisor_mode: doc.supervisor_mode,
    }))
}

/// Non-streaming turn: runs to completion, returns the committed messages.
async fn message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    ensure_session_exists(&state, &id)?;

    let lock = session_turn_lock(&state, &id).await;
    let _guard = lock
        .try_lock()
        .map_err(|_| AppError::Conflict(format!("Session {id} is busy")))?;

    let (tx, mut rx) = mpsc::channel::<StreamEvent>(STREAM_CHANNEL_BUFFER);
    let collector = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let result = state
        .orchestrator
        .run_turn(&id, &req.user_prompt, &tx, CancellationToken::new())
        .await;
    drop(tx);
    let _ = collector.await;

    Ok(Json(MessageResponse { messages: result? }))
}

/// Streaming turn: newline-delimited JSON frames.
async fn message_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Response, AppError> {
    ensure_session_exists(&state, &id)?;

    let lock = session_turn_lock(&state, &id).await;
    let guard = lock
        .clone()
        .try_lock_owned()
        .map_err(|_| AppError::Conflict(format!("Session {id} is busy")))?;

    let (tx, rx) = mpsc::channel::<StreamEvent>(STREAM_CHANNEL_BUFFER);

    // Client disconnect fires the turn's cancellation token.
    let cancel = CancellationToken::new();
    let disconnect_tx = tx.clone();
    let disconnect_token = cancel.clone();
    tokio::spawn(async move {
        disconnect_tx.closed().await;
        disconnect_token.cancel();
    });

    let orchestrator = state.orchestrator.clone();
    let session_id = id.clone();
    tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = orchestrator
            .run_turn(&session_id, &req.user_prompt, &tx, cancel)
            .await
        {
            tracing::warn!(session_id = %session_id, "turn ended with error: {e}");
        }
    });

    let body = Body::from_stream(
        ReceiverStream::new(rx).map(|ev| Ok::<_, Infallible>(ev.to_ndjson())),
    );
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Delete sessions with no messages and no enabled agents.
async fn cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>, AppError> {
    let removed = state.store.cleanup().await?;
    let remaining = state.store.list()?.len();
    Ok(Json(CleanupResponse { removed, remaining }))
}

fn ensure_session_exists(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .store
        .get(id)?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

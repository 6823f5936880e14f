//! Unified error handling for the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use maestro_core::CoreError;
use serde::Serialize;

/// API error response body.
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

/// Application error types.
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "BUSY", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        (
            status,
            Json(ApiError {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SessionNotFound(id) => AppError::NotFound(format!("Session {id} not found")),
            CoreError::Busy(id) => AppError::Conflict(format!("Session {id} is busy")),
            CoreError::EmptyPrompt => AppError::BadRequest("Prompt must not be empty".to_string()),
            CoreError::NoAgentsEnabled => {
                AppError::BadRequest("No agents enabled for this session".to_string())
            }
            other => {
                tracing::error!("internal error: {other}");
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("internal error: {err:?}");
        AppError::Internal(err.to_string())
    }
}

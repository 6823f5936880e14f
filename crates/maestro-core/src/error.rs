//! Typed errors for the orchestration core.
//!
//! Everything below the orchestrator either returns one of these kinds or is
//! wrapped into one by the orchestrator. User-visible failures always end
//! with a terminal stream event so the client can finalize layout.

use thiserror::Error;

/// Core error kinds.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Static catalog failed to load or validate. Fatal at process start,
    /// recoverable across a subsequent reload.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// An LLM or search provider call failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// The supervisor analyzer failed to produce a usable plan.
    #[error("plan error: {0}")]
    Plan(String),

    /// Session persistence failure. The turn is aborted and in-memory
    /// history for the request is discarded.
    #[error("store error: {0}")]
    Store(String),

    #[error("session {0} not found")]
    SessionNotFound(String),

    /// A second concurrent turn was attempted on the same session.
    #[error("session {0} is busy")]
    Busy(String),

    /// Cooperative cancellation: the client disconnected or the turn
    /// timed out.
    #[error("turn cancelled")]
    Cancelled,

    #[error("empty prompt")]
    EmptyPrompt,

    #[error("no agents enabled for this session")]
    NoAgentsEnabled,
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Store(err.to_string())
    }
}

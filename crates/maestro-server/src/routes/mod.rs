//! API route registration.

use axum::{routing::get, Router};

use crate::AppState;

pub mod agents;
pub mod chats;
pub mod knowledge;
pub mod tools;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/chats", chats::router())
        .nest("/agents", agents::router())
        .route("/tools", get(tools::list_tools))
        .route("/skills", get(agents::list_skills))
        .route("/knowledgebase", get(knowledge::list_keys))
}

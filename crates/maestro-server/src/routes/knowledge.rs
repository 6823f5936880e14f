//! Knowledge catalog endpoint.

use axum::{extract::State, Json};

use crate::types::KnowledgeKeyResponse;
use crate::AppState;

/// List knowledge sub-document keys with display labels.
pub async fn list_keys(State(state): State<AppState>) -> Json<Vec<KnowledgeKeyResponse>> {
    let keys = state
        .knowledge
        .keys()
        .into_iter()
        .map(|(key, label)| KnowledgeKeyResponse { key, label })
        .collect();
    Json(keys)
}

//! Agent catalog endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::error::AppError;
use crate::types::{AgentResponse, ReloadResponse, SkillResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agents))
        .route("/reload", post(reload_agents))
        .route("/:id", get(get_agent))
        .route("/capabilities/:capability", get(by_capability))
}

/// List all agent definitions.
async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentResponse>> {
    let agents = state.registry.list().into_iter().map(Into::into).collect();
    Json(agents)
}

/// Get one agent's metadata.
async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentResponse>, AppError> {
    state
        .registry
        .get(&id)
        .map(|a| Json(a.into()))
        .ok_or_else(|| AppError::NotFound(format!("Agent '{id}' not found")))
}

/// Agents carrying a capability tag.
async fn by_capability(
    State(state): State<AppState>,
    Path(capability): Path<String>,
) -> Json<Vec<String>> {
    Json(state.registry.by_capability(&capability))
}

/// Reload the catalog; the swap is atomic and readers never see a partial
/// catalog.
async fn reload_agents(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let agents = state.registry.reload()?;
    Ok(Json(ReloadResponse { agents }))
}

/// The catalog's skill table.
pub async fn list_skills(State(state): State<AppState>) -> Json<Vec<SkillResponse>> {
    let snapshot = state.registry.snapshot();
    let skills = snapshot
        .skills
        .iter()
        .map(|(id, skill)| SkillResponse {
            id: id.clone(),
            name: skill.name.clone(),
            description: skill.description.clone(),
            parameters: serde_json::to_value(&skill.parameters)
                .unwrap_or(serde_json::Value::Null),
        })
        .collect();
    Json(skills)
}

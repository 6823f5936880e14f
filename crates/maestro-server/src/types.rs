//! Request and response types for the API.

use maestro_core::catalog::AgentDefinition;
use maestro_core::session::{PlanEntry, SessionDoc, StoredMessage};
use serde::{Deserialize, Serialize};

// ============================================================================
// Session Types
// ============================================================================

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub id: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: String,
    pub agent_sequence: Vec<PlanEntry>,
    pub supervisor_mode: bool,
    pub message_count: usize,
}

impl From<SessionDoc> for SessionSummary {
    fn from(doc: SessionDoc) -> Self {
        Self {
            id: doc.id,
            created_at: doc.created_at.to_rfc3339(),
            message_count: doc.history.len(),
            agent_sequence: doc.agent_sequence,
            supervisor_mode: doc.supervisor_mode,
        }
    }
}

#[derive(Deserialize)]
pub struct SettingsRequest {
    pub agent_sequence: Vec<PlanEntry>,
    #[serde(default)]
    pub supervisor_mode: bool,
}

#[derive(Deserialize)]
pub struct SupervisorQuery {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Serialize)]
pub struct SupervisorStatus {
    pub supervisor_mode: bool,
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
    pub remaining: usize,
}

// ============================================================================
// Chat Types
// ============================================================================

#[derive(Deserialize)]
pub struct MessageRequest {
    pub user_prompt: String,
}

/// Aggregated result of a non-streaming turn.
#[derive(Serialize)]
pub struct MessageResponse {
    pub messages: Vec<StoredMessage>,
}

// ============================================================================
// Catalog Types
// ============================================================================

/// Agent definition as exposed over the API; the system prompt stays
/// server-side.
#[derive(Serialize)]
pub struct AgentResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub skills: Vec<String>,
    pub routing_keywords: Vec<String>,
    pub active: bool,
    pub category: String,
    pub version: String,
}

impl From<AgentDefinition> for AgentResponse {
    fn from(a: AgentDefinition) -> Self {
        Self {
            id: a.id,
            name: a.name,
            description: a.description,
            capabilities: a.capabilities,
            skills: a.skills,
            routing_keywords: a.routing_keywords,
            active: a.active,
            category: a.category,
            version: a.version,
        }
    }
}

#[derive(Serialize)]
pub struct SkillResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub agents: usize,
}

#[derive(Serialize)]
pub struct KnowledgeKeyResponse {
    pub key: String,
    pub label: String,
}

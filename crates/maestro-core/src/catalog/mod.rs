//! Agent catalog: definitions, skills, and the validating loader.
//!
//! The catalog is a single JSON document with top-level `agents` (map of
//! id → definition), `skills` (map of id → skill), and `metadata`. The
//! loader rejects the document when any agent lacks `id` or `system_prompt`
//! and warns on unknown skill ids. Declaration order of the `agents` map is
//! preserved; it is the tie-breaker for routing scores.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

mod registry;
pub use registry::AgentRegistry;

/// Model parameters for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// One agent definition, materialized from the catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default)]
    pub routing_keywords: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub version: String,
}

fn default_active() -> bool {
    true
}

/// A named skill an agent can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

/// Catalog document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogMetadata {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub schema_version: u32,
}

/// A fully validated, immutable catalog snapshot.
#[derive(Debug)]
pub struct Catalog {
    agents: Vec<AgentDefinition>,
    index: HashMap<String, usize>,
    pub skills: BTreeMap<String, SkillDefinition>,
    pub metadata: CatalogMetadata,
}

impl Catalog {
    /// Parse and validate a catalog document.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        #[derive(Deserialize)]
        struct Document {
            // serde_json's preserve_order feature keeps declaration order here.
            agents: serde_json::Map<String, Value>,
            #[serde(default)]
            skills: BTreeMap<String, SkillDefinition>,
            #[serde(default)]
            metadata: CatalogMetadata,
        }

        let doc: Document = serde_json::from_str(text)
            .map_err(|e| CoreError::Catalog(format!("malformed catalog document: {e}")))?;

        let mut agents = Vec::with_capacity(doc.agents.len());
        let mut index = HashMap::new();

        for (key, raw) in doc.agents {
            for field in ["id", "system_prompt"] {
                let present = raw
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.is_empty());
                if !present {
                    return Err(CoreError::Catalog(format!(
                        "agent '{key}' is missing required field `{field}`"
                    )));
                }
            }

            let mut agent: AgentDefinition = serde_json::from_value(raw)
                .map_err(|e| CoreError::Catalog(format!("agent '{key}': {e}")))?;
            if agent.id != key {
                return Err(CoreError::Catalog(format!(
                    "agent key '{key}' does not match its id '{}'",
                    agent.id
                )));
            }
            if agent.name.is_empty() {
                agent.name = agent.id.clone();
            }

            for skill in &agent.skills {
                if !doc.skills.contains_key(skill) {
                    tracing::warn!(agent = %agent.id, skill = %skill, "agent references unknown skill");
                }
            }

            if index.insert(agent.id.clone(), agents.len()).is_some() {
                return Err(CoreError::Catalog(format!("duplicate agent id '{key}'")));
            }
            agents.push(agent);
        }

        Ok(Self {
            agents,
            index,
            skills: doc.skills,
            metadata: doc.metadata,
        })
    }

    /// All definitions, in declaration order.
    pub fn agents(&self) -> &[AgentDefinition] {
        &self.agents
    }

    pub fn get(&self, id: &str) -> Option<&AgentDefinition> {
        self.index.get(id).map(|&i| &self.agents[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Active definitions eligible for routing, in declaration order.
    pub fn routable(&self) -> impl Iterator<Item = &AgentDefinition> {
        self.agents.iter().filter(|a| a.active)
    }

    /// Ids of agents carrying a capability tag.
    pub fn by_capability(&self, tag: &str) -> Vec<String> {
        self.agents
            .iter()
            .filter(|a| a.capabilities.iter().any(|c| c == tag))
            .map(|a| a.id.clone())
            .collect()
    }

    /// Routing keywords for an agent, empty when unknown.
    pub fn keywords(&self, id: &str) -> Vec<String> {
        self.get(id)
            .map(|a| a.routing_keywords.clone())
            .unwrap_or_default()
    }
}

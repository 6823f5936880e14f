//! Session document model.
//!
//! One JSON document per session: history, the stored manual plan, and the
//! supervisor flag. Messages are immutable once committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tool bound to a manual plan entry. Deserializes from either a bare
/// tool name or `{name, option}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolBinding {
    Bare(String),
    Configured {
        #[serde(alias = "tool_id")]
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        option: Option<String>,
    },
}

impl ToolBinding {
    pub fn name(&self) -> &str {
        match self {
            ToolBinding::Bare(name) => name,
            ToolBinding::Configured { name, .. } => name,
        }
    }

    pub fn option(&self) -> Option<&str> {
        match self {
            ToolBinding::Bare(_) => None,
            ToolBinding::Configured { option, .. } => option.as_deref(),
        }
    }
}

/// One entry of the manual agent pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub id: String,
    pub enabled: bool,
    #[serde(default)]
    pub tools: Vec<ToolBinding>,
}

/// One committed history message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub sender: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_supervisor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_decision: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl StoredMessage {
    fn base(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            tool_id: None,
            for_agent: None,
            via_supervisor: None,
            routing_decision: None,
            chosen_agent: None,
            error: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::base("user", text)
    }

    pub fn system_error(text: impl Into<String>) -> Self {
        let mut msg = Self::base("system", text);
        msg.error = Some(true);
        msg
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::base("system", text)
    }

    pub fn supervisor(text: impl Into<String>) -> Self {
        Self::base("supervisor", text)
    }

    pub fn supervisor_decision(text: impl Into<String>, chosen_agent: impl Into<String>) -> Self {
        let mut msg = Self::base("supervisor", text);
        msg.routing_decision = Some(true);
        msg.chosen_agent = Some(chosen_agent.into());
        msg
    }

    pub fn tool(
        tool_id: impl Into<String>,
        text: impl Into<String>,
        for_agent: impl Into<String>,
        via_supervisor: bool,
        is_error: bool,
    ) -> Self {
        let mut msg = Self::base("tool", text);
        msg.tool_id = Some(tool_id.into());
        msg.for_agent = Some(for_agent.into());
        msg.via_supervisor = via_supervisor.then_some(true);
        msg.error = is_error.then_some(true);
        msg
    }

    pub fn agent(agent_id: impl Into<String>, text: impl Into<String>, via_supervisor: bool) -> Self {
        let mut msg = Self::base(agent_id, text);
        msg.via_supervisor = via_supervisor.then_some(true);
        msg
    }
}

/// The persisted session document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDoc {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<StoredMessage>,
    #[serde(default)]
    pub agent_sequence: Vec<PlanEntry>,
    #[serde(default)]
    pub supervisor_mode: bool,
}

impl SessionDoc {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            history: Vec::new(),
            agent_sequence: Vec::new(),
            supervisor_mode: false,
        }
    }

    /// A session is empty when it has no messages and no enabled agents.
    /// Empty sessions are hidden from listings and removed by cleanup.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && !self.agent_sequence.iter().any(|a| a.enabled)
    }
}

//! Execution plan types produced by the analyzer.

use std::fmt;

use serde::Serialize;

use super::entities::Entities;

/// What kind of resource a component maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Agent,
    Tool,
    Knowledge,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Agent => write!(f, "AGENT"),
            ResourceKind::Tool => write!(f, "TOOL"),
            ResourceKind::Knowledge => write!(f, "KNOWLEDGE"),
        }
    }
}

/// One decomposed piece of the user query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryComponent {
    /// Stable component id ("c1", "c2", ...), referenced by `dependencies`.
    pub id: String,
    /// Short text summary of what this component covers.
    pub summary: String,
    pub intent: String,
    pub entities: Entities,
    pub kind: ResourceKind,
    pub resource_id: String,
    /// 1 = highest, 3 = lowest.
    pub priority: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Sequential,
    Hierarchical,
    Parallel,
    MultiAgentSequential,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Sequential => write!(f, "sequential"),
            Strategy::Hierarchical => write!(f, "hierarchical"),
            Strategy::Parallel => write!(f, "parallel"),
            Strategy::MultiAgentSequential => write!(f, "multi_agent_sequential"),
        }
    }
}

/// How the primary agent should blend tool and knowledge outputs with its
/// persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextFusion {
    PersonaIntegratedStorytelling,
    HumorIntegration,
    FactualIntegration,
    NarrativeIntegration,
}

impl ContextFusion {
    /// The natural-language instruction injected into the agent context.
    pub fn directive(&self) -> &'static str {
        match self {
            ContextFusion::PersonaIntegratedStorytelling => {
                "Integrate the gathered facts into a warm, wise grandmotherly voice, \
                 weaving them into traditional stories and advice."
            }
            ContextFusion::HumorIntegration => {
                "Work the gathered information into the humor naturally; the facts \
                 should feed the jokes, not interrupt them."
            }
            ContextFusion::FactualIntegration => {
                "Integrate the gathered information naturally and accurately into \
                 your response."
            }
            ContextFusion::NarrativeIntegration => {
                "Blend the gathered information into an engaging narrative."
            }
        }
    }
}

impl fmt::Display for ContextFusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextFusion::PersonaIntegratedStorytelling => write!(f, "persona_integrated_storytelling"),
            ContextFusion::HumorIntegration => write!(f, "humor_integration"),
            ContextFusion::FactualIntegration => write!(f, "factual_integration"),
            ContextFusion::NarrativeIntegration => write!(f, "narrative_integration"),
        }
    }
}

/// The analyzer's structured output for one turn.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub components: Vec<QueryComponent>,
    pub strategy: Strategy,
    /// The agent whose output is the user-facing answer; always the last
    /// entry of `agent_sequence` when a sequence is present.
    pub primary_agent: String,
    pub tools_needed: Vec<String>,
    pub knowledge_needed: Vec<String>,
    pub context_fusion: ContextFusion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_sequence: Option<Vec<String>>,
}

impl ExecutionPlan {
    /// The narrative decision text shown as the supervisor's routing message.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "Analysis results:\nStrategy: {}\nPrimary agent: {}\nComponents detected: {}",
            self.strategy,
            self.primary_agent,
            self.components.len()
        );
        for (i, c) in self.components.iter().enumerate() {
            text.push_str(&format!(
                "\n  {}. {} -> {}: {}",
                i + 1,
                c.intent,
                c.kind,
                c.resource_id
            ));
        }
        if let Some(sequence) = &self.agent_sequence {
            text.push_str(&format!("\nAgent sequence: {}", sequence.join(" -> ")));
        }
        text.push_str(&format!(
            "\nTools required: {}",
            if self.tools_needed.is_empty() {
                "None".to_string()
            } else {
                self.tools_needed.join(", ")
            }
        ));
        if !self.knowledge_needed.is_empty() {
            text.push_str(&format!(
                "\nKnowledge required: {}",
                self.knowledge_needed.join(", ")
            ));
        }
        text.push_str(&format!("\nContext fusion: {}", self.context_fusion));
        text
    }
}

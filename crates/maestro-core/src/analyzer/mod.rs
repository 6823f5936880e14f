//! Supervisor query analyzer.
//!
//! Decomposes the user prompt into components, maps each to a resource
//! (agent, tool, knowledge key), scores agents against the detected intent,
//! and emits a structured [`ExecutionPlan`]. The pipeline is deterministic
//! given the same registry and prompt.

pub mod entities;
pub mod intents;
pub mod plan;

pub use entities::{extract_entities, Entities};
pub use intents::{detect_intents, has_intent, DetectedIntent, Intent};
pub use plan::{ContextFusion, ExecutionPlan, QueryComponent, ResourceKind, Strategy};

use crate::catalog::{AgentDefinition, Catalog};
use crate::error::CoreError;
use crate::knowledge::KnowledgeBase;

/// Scoring weights for agent selection.
const KEYWORD_WEIGHT: f32 = 2.0;
const CAPABILITY_WEIGHT: f32 = 1.5;
const INTENT_WEIGHT: f32 = 10.0;
const NAME_HINT_WEIGHT: f32 = 5.0;

/// Cues that mark the data-gathering half of a multi-agent request.
const ANALYSIS_CUES: &[&str] = &[
    "analyze", "analyse", "analysis", "compare", "evaluate", "research", "statistics",
];

/// Cues that mark a presentation handoff ("...and let granny tell me").
const HANDOFF_CUES: &[&str] = &["tell", "explain", "describe", "present", "narrate"];

pub struct QueryAnalyzer<'a> {
    catalog: &'a Catalog,
    knowledge: &'a KnowledgeBase,
    default_agent: &'a str,
}

impl<'a> QueryAnalyzer<'a> {
    pub fn new(catalog: &'a Catalog, knowledge: &'a KnowledgeBase, default_agent: &'a str) -> Self {
        Self {
            catalog,
            knowledge,
            default_agent,
        }
    }

    /// Run the full analysis pipeline.
    pub fn analyze(&self, prompt: &str) -> Result<ExecutionPlan, CoreError> {
        if self.catalog.routable().next().is_none() {
            return Err(CoreError::Plan("no routable agents in catalog".into()));
        }

        let extracted = extract_entities(prompt);
        let detected = detect_intents(prompt);
        let prompt_lower = prompt.to_lowercase();

        let knowledge_hints = self.knowledge.match_keys(prompt);

        let mut components: Vec<QueryComponent> = Vec::new();
        let mut next_id = 0usize;
        let mut component_id = move || {
            next_id += 1;
            format!("c{next_id}")
        };

        // Agent components: either a data-gathering -> persona sequence, or
        // a single primary agent picked from the detected intents.
        let sequence = self.detect_agent_sequence(&prompt_lower);
        let mut agent_ids: Vec<String> = Vec::new();

        if let Some((analyst, persona)) = sequence {
            let first_id = component_id();
            components.push(QueryComponent {
                id: first_id.clone(),
                summary: "data gathering and analysis".into(),
                intent: "data_analysis".into(),
                entities: extracted.clone(),
                kind: ResourceKind::Agent,
                resource_id: analyst.clone(),
                priority: 1,
                dependencies: Vec::new(),
            });
            components.push(QueryComponent {
                id: component_id(),
                summary: "present the findings in persona".into(),
                intent: "persona_presentation".into(),
                entities: extracted.clone(),
                kind: ResourceKind::Agent,
                resource_id: persona.clone(),
                priority: 1,
                dependencies: vec![first_id],
            });
            agent_ids.push(analyst);
            agent_ids.push(persona);
        } else {
            let (summary, intent, tags) = primary_intent(&detected, &prompt_lower);
            let agent = self
                .select_agent(&prompt_lower, &tags)
                .unwrap_or_else(|| self.default_agent.to_string());
            components.push(QueryComponent {
                id: component_id(),
                summary: summary.into(),
                intent: intent.into(),
                entities: extracted.clone(),
                kind: ResourceKind::Agent,
                resource_id: agent.clone(),
                priority: 1,
                dependencies: Vec::new(),
            });
            agent_ids.push(agent);
        }

        // Tool components: one per current-information intent.
        let mut tools_needed: Vec<String> = Vec::new();
        for intent in [Intent::Weather, Intent::CurrentEvents] {
            if has_intent(&detected, intent) {
                components.push(QueryComponent {
                    id: component_id(),
                    summary: "current information".into(),
                    intent: "information_gathering".into(),
                    entities: extracted.clone(),
                    kind: ResourceKind::Tool,
                    resource_id: "web_search".into(),
                    priority: 2,
                    dependencies: Vec::new(),
                });
                if !tools_needed.iter().any(|t| t == "web_search") {
                    tools_needed.push("web_search".into());
                }
            }
        }

        // Knowledge components, deduplicated by key.
        let mut knowledge_needed: Vec<String> = Vec::new();
        for key in knowledge_hints {
            if knowledge_needed.contains(&key) {
                continue;
            }
            components.push(QueryComponent {
                id: component_id(),
                summary: format!("knowledge from {key}"),
                intent: "knowledge_retrieval".into(),
                entities: extracted.clone(),
                kind: ResourceKind::Knowledge,
                resource_id: key.clone(),
                priority: 2,
                dependencies: Vec::new(),
            });
            knowledge_needed.push(key);
        }

        // Stable ordering within priority levels.
        components.sort_by_key(|c| c.priority);

        let agent_sequence = (agent_ids.len() > 1).then(|| agent_ids.clone());
        let primary_agent = agent_ids.last().cloned().expect("at least one agent");

        let tool_components = components
            .iter()
            .filter(|c| c.kind == ResourceKind::Tool)
            .count();
        let strategy = if agent_sequence.is_some() {
            Strategy::MultiAgentSequential
        } else if components.len() >= 3 {
            Strategy::Hierarchical
        } else if tool_components > 1 {
            Strategy::Parallel
        } else {
            Strategy::Sequential
        };

        let context_fusion = self.select_fusion(&agent_ids, &detected);

        Ok(ExecutionPlan {
            components,
            strategy,
            primary_agent,
            tools_needed,
            knowledge_needed,
            context_fusion,
            agent_sequence,
        })
    }

    /// Score every routable agent; highest non-zero score wins, ties broken
    /// by catalog declaration order. `None` when nothing scores above zero.
    fn select_agent(&self, prompt_lower: &str, intent_tags: &[&str]) -> Option<String> {
        let mut best: Option<(&AgentDefinition, f32)> = None;
        for agent in self.catalog.routable() {
            let score = score_agent(agent, prompt_lower, intent_tags);
            if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((agent, score));
            }
        }
        best.map(|(a, _)| a.id.clone())
    }

    /// A multi-agent sequence is planned when the prompt pairs an analytic
    /// task with an explicit handoff to a named persona agent.
    fn detect_agent_sequence(&self, prompt_lower: &str) -> Option<(String, String)> {
        if !ANALYSIS_CUES.iter().any(|c| prompt_lower.contains(c)) {
            return None;
        }
        if !HANDOFF_CUES.iter().any(|c| prompt_lower.contains(c)) {
            return None;
        }
        let analyst = self.select_agent(prompt_lower, &["analysis", "research", "data"])?;
        let persona = self
            .catalog
            .routable()
            .find(|a| a.id != analyst && name_mentioned(a, prompt_lower))
            .map(|a| a.id.clone())?;
        Some((analyst, persona))
    }

    fn select_fusion(&self, agent_ids: &[String], detected: &[DetectedIntent]) -> ContextFusion {
        let has_cap = |tag: &str| {
            agent_ids.iter().any(|id| {
                self.catalog
                    .get(id)
                    .is_some_and(|a| a.capabilities.iter().any(|c| c == tag))
            })
        };
        if has_cap("cultural") {
            return ContextFusion::PersonaIntegratedStorytelling;
        }
        if has_cap("humor") {
            return ContextFusion::HumorIntegration;
        }
        let information_only = !detected.is_empty()
            && detected.iter().all(|d| {
                matches!(
                    d.intent,
                    Intent::Information | Intent::CurrentEvents | Intent::Weather
                )
            });
        if information_only {
            ContextFusion::FactualIntegration
        } else {
            ContextFusion::NarrativeIntegration
        }
    }
}

/// The primary agent component's (summary, intent, capability tags), by
/// intent priority: humor, then recipe, then storytelling, then default.
fn primary_intent(
    detected: &[DetectedIntent],
    prompt_lower: &str,
) -> (&'static str, &'static str, Vec<&'static str>) {
    if has_intent(detected, Intent::Humor) {
        return ("humor/parody creation", "humor_creation", vec!["humor"]);
    }
    if has_intent(detected, Intent::Recipe) {
        let cultural = has_intent(detected, Intent::Cultural) || prompt_lower.contains("traditional");
        let intent = if cultural {
            "recipe_with_tradition"
        } else {
            "recipe"
        };
        return ("traditional recipe guidance", intent, vec!["recipes", "cultural"]);
    }
    if has_intent(detected, Intent::Storytelling) {
        return ("creative story", "storytelling", vec!["storytelling"]);
    }
    // No capability tags: an unmatched prompt scores zero everywhere and
    // falls through to the configured default agent.
    ("general response", "general", Vec::new())
}

fn score_agent(agent: &AgentDefinition, prompt_lower: &str, intent_tags: &[&str]) -> f32 {
    let keyword_hits = agent
        .routing_keywords
        .iter()
        .filter(|k| prompt_lower.contains(&k.to_lowercase()))
        .count() as f32;
    let capability_hits = agent
        .capabilities
        .iter()
        .filter(|c| prompt_lower.contains(&c.to_lowercase()))
        .count() as f32;
    let intent_match = agent
        .capabilities
        .iter()
        .any(|c| intent_tags.iter().any(|t| c == t));
    let name_hint = name_mentioned(agent, prompt_lower);

    keyword_hits * KEYWORD_WEIGHT
        + capability_hits * CAPABILITY_WEIGHT
        + if intent_match { INTENT_WEIGHT } else { 0.0 }
        + if name_hint { NAME_HINT_WEIGHT } else { 0.0 }
}

fn name_mentioned(agent: &AgentDefinition, prompt_lower: &str) -> bool {
    let id_spaced = agent.id.replace('_', " ");
    prompt_lower.contains(&agent.id.to_lowercase())
        || prompt_lower.contains(&id_spaced.to_lowercase())
        || (!agent.name.is_empty() && prompt_lower.contains(&agent.name.to_lowercase()))
}

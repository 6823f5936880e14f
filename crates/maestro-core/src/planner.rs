//! Step planner.
//!
//! Maps either the session's manual agent pipeline or the analyzer's
//! execution plan into a totally ordered list of steps. The runtime never
//! reorders steps: all tool steps for an agent precede its agent step, and
//! within a multi-agent sequence each agent sees its predecessor's output.

use crate::analyzer::{ContextFusion, ExecutionPlan};
use crate::catalog::Catalog;
use crate::knowledge::KnowledgeBase;
use crate::session::PlanEntry;
use crate::tools::{self, KNOWLEDGEBASE, WEB_SEARCH};

/// One unit of turn execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run a tool before the given agent.
    Tool {
        tool_id: String,
        option: Option<String>,
        for_agent: String,
    },
    /// Run an agent with the accumulated tool outputs.
    Agent { agent_id: String },
    /// Supervisor hand-off announcement; no LLM call.
    Delegation {
        message: String,
        target_agent: String,
    },
}

/// An ordered plan plus any warnings produced while building it.
#[derive(Debug, Clone)]
pub struct Plan {
    pub steps: Vec<Step>,
    pub warnings: Vec<String>,
    /// Fusion directive for agent context composition (supervisor mode).
    pub context_fusion: Option<ContextFusion>,
    /// The agent whose output is the user-facing answer.
    pub primary_agent: Option<String>,
    /// True when this plan came from the supervisor analyzer.
    pub supervisor: bool,
}

impl Plan {
    pub fn agent_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Agent { .. }))
            .count()
    }
}

/// Build a plan from the session's manual agent pipeline.
///
/// Tool bindings stored per agent are merged with prompt-inferred tools
/// (inferred take precedence); duplicates per agent are dropped. Entries
/// referencing agents missing from the registry are skipped with a warning.
pub fn from_manual(
    entries: &[PlanEntry],
    prompt: &str,
    catalog: &Catalog,
    knowledge: &KnowledgeBase,
) -> Plan {
    let mut steps = Vec::new();
    let mut warnings = Vec::new();
    let mut primary_agent = None;

    for entry in entries.iter().filter(|e| e.enabled) {
        if !catalog.contains(&entry.id) {
            warnings.push(format!(
                "agent '{}' is not in the registry; skipping its pipeline entry",
                entry.id
            ));
            continue;
        }

        let mut bound: Vec<(String, Option<String>)> = Vec::new();

        // Prompt-inferred tools run even when not manually bound.
        if tools::has_web_cues(prompt) {
            bound.push((WEB_SEARCH.to_string(), None));
        }
        if let Some(key) = knowledge.match_key(prompt) {
            bound.push((KNOWLEDGEBASE.to_string(), Some(key)));
        }

        for binding in &entry.tools {
            if bound.iter().any(|(name, _)| name == binding.name()) {
                continue;
            }
            bound.push((
                binding.name().to_string(),
                binding.option().map(str::to_string),
            ));
        }

        for (tool_id, option) in bound {
            steps.push(Step::Tool {
                tool_id,
                option,
                for_agent: entry.id.clone(),
            });
        }
        steps.push(Step::Agent {
            agent_id: entry.id.clone(),
        });
        primary_agent = Some(entry.id.clone());
    }

    Plan {
        steps,
        warnings,
        context_fusion: None,
        primary_agent,
        supervisor: false,
    }
}

/// Build a plan from the analyzer's execution plan.
///
/// Priority-2 resources (tools, knowledge) precede the agent steps; in a
/// multi-agent sequence every agent is announced with a delegation step.
pub fn from_execution_plan(plan: &ExecutionPlan) -> Plan {
    let mut steps = Vec::new();

    let agents: Vec<String> = plan
        .agent_sequence
        .clone()
        .unwrap_or_else(|| vec![plan.primary_agent.clone()]);
    let gather_for = agents.first().cloned().unwrap_or_default();

    for tool_id in &plan.tools_needed {
        steps.push(Step::Tool {
            tool_id: tool_id.clone(),
            option: None,
            for_agent: gather_for.clone(),
        });
    }
    for key in &plan.knowledge_needed {
        steps.push(Step::Tool {
            tool_id: KNOWLEDGEBASE.to_string(),
            option: Some(key.clone()),
            for_agent: gather_for.clone(),
        });
    }

    let multi = agents.len() > 1;
    for (i, agent_id) in agents.iter().enumerate() {
        if multi {
            steps.push(Step::Delegation {
                message: format!(
                    "Delegating to {} (step {}/{})",
                    agent_id,
                    i + 1,
                    agents.len()
                ),
                target_agent: agent_id.clone(),
            });
        }
        steps.push(Step::Agent {
            agent_id: agent_id.clone(),
        });
    }

    Plan {
        steps,
        warnings: Vec::new(),
        context_fusion: Some(plan.context_fusion),
        primary_agent: Some(plan.primary_agent.clone()),
        supervisor: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{QueryAnalyzer, Strategy};
    use crate::session::ToolBinding;
    use std::path::PathBuf;

    fn catalog() -> Catalog {
        Catalog::parse(
            r#"{
            "agents": {
                "granny": {"id": "granny", "system_prompt": "p",
                           "capabilities": ["cultural", "storytelling", "recipes"],
                           "routing_keywords": ["granny", "traditional", "romanian"]},
                "data_analyst": {"id": "data_analyst", "system_prompt": "p",
                                 "capabilities": ["analysis", "research", "data"],
                                 "routing_keywords": ["analyze", "data"]}
            }
        }"#,
        )
        .unwrap()
    }

    fn knowledge() -> KnowledgeBase {
        KnowledgeBase::parse(
            r#"{"ciorba": {"label": "Ciorba", "keywords": ["ciorba", "soup"], "content": "recipe"}}"#,
            PathBuf::from("."),
        )
        .unwrap()
    }

    #[test]
    fn manual_plan_orders_tools_before_agent() {
        let entries = vec![PlanEntry {
            id: "granny".into(),
            enabled: true,
            tools: vec![ToolBinding::Configured {
                name: KNOWLEDGEBASE.into(),
                option: Some("ciorba".into()),
            }],
        }];
        let plan = from_manual(
            &entries,
            "How do I make traditional Romanian ciorba?",
            &catalog(),
            &knowledge(),
        );
        assert!(plan.warnings.is_empty());
        // knowledgebase is inferred from the prompt with option ciorba, the
        // manual binding deduplicates against it
        assert_eq!(
            plan.steps,
            vec![
                Step::Tool {
                    tool_id: KNOWLEDGEBASE.into(),
                    option: Some("ciorba".into()),
                    for_agent: "granny".into(),
                },
                Step::Agent {
                    agent_id: "granny".into()
                },
            ]
        );
        assert_eq!(plan.primary_agent.as_deref(), Some("granny"));
    }

    #[test]
    fn unknown_agent_entry_is_skipped_with_warning() {
        let entries = vec![
            PlanEntry {
                id: "ghost".into(),
                enabled: true,
                tools: vec![],
            },
            PlanEntry {
                id: "granny".into(),
                enabled: true,
                tools: vec![],
            },
        ];
        let plan = from_manual(&entries, "hello there", &catalog(), &knowledge());
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("ghost"));
        assert_eq!(plan.agent_count(), 1);
    }

    #[test]
    fn disabled_entries_are_ignored() {
        let entries = vec![PlanEntry {
            id: "granny".into(),
            enabled: false,
            tools: vec![],
        }];
        let plan = from_manual(&entries, "hi", &catalog(), &knowledge());
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn duplicate_manual_tools_are_dropped() {
        let entries = vec![PlanEntry {
            id: "granny".into(),
            enabled: true,
            tools: vec![
                ToolBinding::Bare(WEB_SEARCH.into()),
                ToolBinding::Bare(WEB_SEARCH.into()),
            ],
        }];
        let plan = from_manual(&entries, "hello", &catalog(), &knowledge());
        let tool_steps = plan
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Tool { .. }))
            .count();
        assert_eq!(tool_steps, 1);
    }

    #[test]
    fn execution_plan_with_sequence_emits_delegations() {
        let cat = catalog();
        let kb = knowledge();
        let exec = QueryAnalyzer::new(&cat, &kb, "granny")
            .analyze("Analyze weather in Bucharest last week and let granny tell me about it")
            .unwrap();
        assert_eq!(exec.strategy, Strategy::MultiAgentSequential);

        let plan = from_execution_plan(&exec);
        // web_search first, then delegation/agent pairs in sequence order
        assert!(matches!(&plan.steps[0], Step::Tool { tool_id, .. } if tool_id == WEB_SEARCH));
        let delegations: Vec<&str> = plan
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Delegation { target_agent, .. } => Some(target_agent.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(delegations, vec!["data_analyst", "granny"]);
        assert_eq!(plan.primary_agent.as_deref(), Some("granny"));
        assert!(plan.supervisor);
    }
}

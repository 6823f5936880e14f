//! Agent runner.
//!
//! Composes the LLM input for one agent (system prompt, gathered tool
//! outputs, prior-agent output, the context-fusion directive, the user
//! prompt, and a bounded slice of conversation history) and streams the
//! completion through the [`LlmProvider`] port.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::analyzer::ContextFusion;
use crate::catalog::AgentDefinition;
use crate::error::CoreError;
use crate::providers::{ChatRequest, LlmProvider, StreamPart};
use crate::session::StoredMessage;
use crate::tools::ToolReport;

/// Everything an agent call sees.
pub struct AgentContext<'a> {
    pub definition: &'a AgentDefinition,
    pub user_prompt: &'a str,
    /// Tool outputs gathered earlier in the turn.
    pub tool_reports: &'a [ToolReport],
    /// `(agent_id, text)` of the preceding agent in a sequence.
    pub prior_output: Option<(&'a str, &'a str)>,
    pub fusion: Option<ContextFusion>,
    /// Conversation history from before this turn.
    pub history: &'a [StoredMessage],
    /// How many trailing history messages to include.
    pub history_window: usize,
}

pub struct AgentRunner {
    llm: Arc<dyn LlmProvider>,
}

impl AgentRunner {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Start a streaming run; tokens arrive on the returned channel.
    pub async fn run_streaming(
        &self,
        ctx: &AgentContext<'_>,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, CoreError> {
        self.llm.stream_chat(compose_request(ctx)).await
    }

    /// Run to completion and return the full text.
    pub async fn run_blocking(&self, ctx: &AgentContext<'_>) -> Result<String, CoreError> {
        let mut rx = self.run_streaming(ctx).await?;
        let mut text = String::new();
        while let Some(part) = rx.recv().await {
            match part {
                StreamPart::TextDelta { delta } => text.push_str(&delta),
                StreamPart::Finish => break,
                StreamPart::Error { error } => return Err(CoreError::Provider(error)),
            }
        }
        Ok(text)
    }
}

/// Compose the provider request from an agent context.
pub fn compose_request(ctx: &AgentContext<'_>) -> ChatRequest {
    let mut sections: Vec<String> = Vec::new();

    if !ctx.tool_reports.is_empty() {
        let mut block = String::from("Gathered information:");
        for report in ctx.tool_reports {
            block.push_str(&format!(
                "\n\n[{}] query: {}\n{}\n(gathered for {})",
                report.tool_id, report.query, report.text, report.for_agent
            ));
        }
        sections.push(block);
    }

    if let Some((agent_id, text)) = ctx.prior_output {
        let label = agent_id.to_uppercase();
        sections.push(format!(
            "--- {label} OUTPUT ---\n{text}\n--- END {label} OUTPUT ---\n\nBuild upon the previous agent's work, but respond only as yourself."
        ));
    }

    if let Some(fusion) = ctx.fusion {
        sections.push(format!("Guidance: {}", fusion.directive()));
    }

    sections.push(format!("Current request: {}", ctx.user_prompt));

    if !ctx.history.is_empty() {
        let mut block = String::from("Conversation so far:");
        let elided = ctx.history.len().saturating_sub(ctx.history_window);
        if elided > 0 {
            block.push_str(&format!(
                "\n[earlier conversation elided: {elided} messages]"
            ));
        }
        for msg in ctx.history.iter().skip(elided) {
            block.push_str(&format!("\n{}: {}", msg.sender, msg.text));
        }
        sections.push(block);
    }

    ChatRequest {
        model: ctx.definition.parameters.model.clone(),
        temperature: ctx.definition.parameters.temperature,
        max_tokens: ctx.definition.parameters.max_tokens,
        system: ctx.definition.system_prompt.clone(),
        prompt: sections.join("\n\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use async_trait::async_trait;

    fn definition() -> AgentDefinition {
        let catalog = Catalog::parse(
            r#"{"agents": {"granny": {
                "id": "granny",
                "system_prompt": "You are a warm Romanian grandmother.",
                "parameters": {"temperature": 0.8, "model": "test-model", "max_tokens": 512}
            }}}"#,
        )
        .unwrap();
        catalog.get("granny").unwrap().clone()
    }

    #[test]
    fn composed_prompt_orders_sections() {
        let definition = definition();
        let reports = vec![ToolReport {
            tool_id: "web_search".into(),
            query: "weather Bucharest today".into(),
            text: "Sunny, 24C".into(),
            for_agent: "granny".into(),
            confidence: Some(0.8),
        }];
        let history = vec![
            StoredMessage::user("earlier question"),
            StoredMessage::agent("granny", "earlier answer", false),
        ];
        let ctx = AgentContext {
            definition: &definition,
            user_prompt: "What's the weather like?",
            tool_reports: &reports,
            prior_output: Some(("data_analyst", "Average 22C last week")),
            fusion: Some(ContextFusion::PersonaIntegratedStorytelling),
            history: &history,
            history_window: 20,
        };

        let request = compose_request(&ctx);
        assert_eq!(request.system, "You are a warm Romanian grandmother.");
        assert_eq!(request.model, "test-model");

        let tools_at = request.prompt.find("Gathered information").unwrap();
        let prior_at = request.prompt.find("DATA_ANALYST OUTPUT").unwrap();
        let fusion_at = request.prompt.find("Guidance:").unwrap();
        let prompt_at = request.prompt.find("Current request:").unwrap();
        let history_at = request.prompt.find("Conversation so far:").unwrap();
        assert!(tools_at < prior_at);
        assert!(prior_at < fusion_at);
        assert!(fusion_at < prompt_at);
        assert!(prompt_at < history_at);
        assert!(request.prompt.contains("Sunny, 24C"));
    }

    #[test]
    fn long_history_is_elided() {
        let definition = definition();
        let history: Vec<StoredMessage> = (0..30)
            .map(|i| StoredMessage::user(format!("message {i}")))
            .collect();
        let ctx = AgentContext {
            definition: &definition,
            user_prompt: "hello",
            tool_reports: &[],
            prior_output: None,
            fusion: None,
            history: &history,
            history_window: 20,
        };
        let request = compose_request(&ctx);
        assert!(request
            .prompt
            .contains("[earlier conversation elided: 10 messages]"));
        assert!(request.prompt.contains("message 29"));
        assert!(!request.prompt.contains("message 9\n"));
    }

    struct ScriptedLlm {
        parts: Vec<StreamPart>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn stream_chat(
            &self,
            _request: ChatRequest,
        ) -> Result<mpsc::UnboundedReceiver<StreamPart>, CoreError> {
            let (tx, rx) = mpsc::unbounded_channel();
            for part in self.parts.clone() {
                let _ = tx.send(part);
            }
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn run_blocking_collects_deltas() {
        let definition = definition();
        let runner = AgentRunner::new(Arc::new(ScriptedLlm {
            parts: vec![
                StreamPart::TextDelta { delta: "Hel".into() },
                StreamPart::TextDelta { delta: "lo".into() },
                StreamPart::Finish,
            ],
        }));
        let ctx = AgentContext {
            definition: &definition,
            user_prompt: "hi",
            tool_reports: &[],
            prior_output: None,
            fusion: None,
            history: &[],
            history_window: 20,
        };
        assert_eq!(runner.run_blocking(&ctx).await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn run_blocking_surfaces_provider_error() {
        let definition = definition();
        let runner = AgentRunner::new(Arc::new(ScriptedLlm {
            parts: vec![StreamPart::Error {
                error: "rate limited".into(),
            }],
        }));
        let ctx = AgentContext {
            definition: &definition,
            user_prompt: "hi",
            tool_reports: &[],
            prior_output: None,
            fusion: None,
            history: &[],
            history_window: 20,
        };
        let err = runner.run_blocking(&ctx).await.unwrap_err();
        assert!(matches!(err, CoreError::Provider(_)));
    }
}

//! Turn orchestrator.
//!
//! Drives one user turn: appends the user message, builds the plan
//! (analyzer in supervisor mode, the stored pipeline otherwise), executes
//! tool and agent steps in order, emits frames on the session stream, and
//! commits the turn to the store atomically: either the complete turn or
//! the partial turn closed by a terminal system error. A second turn for
//! the same session never interleaves; the server enforces that with a
//! per-session lock.

pub mod events;

pub use events::StreamEvent;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::{AgentContext, AgentRunner};
use crate::analyzer::QueryAnalyzer;
use crate::catalog::AgentRegistry;
use crate::config::RuntimeConfig;
use crate::error::CoreError;
use crate::knowledge::KnowledgeBase;
use crate::planner::{self, Plan, Step};
use crate::providers::StreamPart;
use crate::session::{SessionDoc, SessionStore, StoredMessage};
use crate::tools::{ToolCache, ToolOutcome, ToolReport, ToolRuntime};

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    knowledge: Arc<KnowledgeBase>,
    tools: Arc<ToolRuntime>,
    runner: AgentRunner,
    store: Arc<SessionStore>,
    config: RuntimeConfig,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        knowledge: Arc<KnowledgeBase>,
        tools: Arc<ToolRuntime>,
        runner: AgentRunner,
        store: Arc<SessionStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            knowledge,
            tools,
            runner,
            store,
            config,
        }
    }

    /// Run one turn for a session.
    ///
    /// Frames are emitted on `events` in causal order. Returns the messages
    /// committed for this turn. The turn is cancellable through `cancel`;
    /// the whole-turn timeout rides the same token.
    pub async fn run_turn(
        &self,
        session_id: &str,
        prompt: &str,
        events: &mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Result<Vec<StoredMessage>, CoreError> {
        if prompt.trim().is_empty() {
            send(events, StreamEvent::system_error("Empty prompt; nothing to do")).await;
            return Err(CoreError::EmptyPrompt);
        }

        let mut doc = self
            .store
            .get(session_id)?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;

        let prior_history = doc.history.clone();
        let turn_start = doc.history.len();
        doc.history.push(StoredMessage::user(prompt));

        // The turn timeout fires the same token as a client disconnect.
        let cancel = cancel.child_token();
        let timeout_token = cancel.clone();
        let turn_timeout = self.config.turn_timeout;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(turn_timeout).await;
            timeout_token.cancel();
        });

        let result = self
            .run_steps(&mut doc, prompt, &prior_history, events, &cancel)
            .await;
        timer.abort();

        match result {
            Ok(()) => {
                if let Err(e) = self.store.put(&doc.id, &doc).await {
                    send(
                        events,
                        StreamEvent::system_error(format!("failed to persist session: {e}")),
                    )
                    .await;
                    return Err(e);
                }
                Ok(doc.history[turn_start..].to_vec())
            }
            Err(CoreError::Cancelled) => {
                // Edge-triggered: no further frames. Already-committed
                // history remains; the terminal marker is persisted.
                doc.history
                    .push(StoredMessage::system_error("cancelled: turn aborted"));
                if let Err(e) = self.store.put(&doc.id, &doc).await {
                    tracing::warn!("failed to persist cancelled turn: {e}");
                }
                Err(CoreError::Cancelled)
            }
            Err(e) => {
                // Terminal failure: exactly one system error closes the turn.
                let text = e.to_string();
                doc.history.push(StoredMessage::system_error(&text));
                send(events, StreamEvent::system_error(&text)).await;
                self.store.put(&doc.id, &doc).await?;
                Ok(doc.history[turn_start..].to_vec())
            }
        }
    }

    async fn run_steps(
        &self,
        doc: &mut SessionDoc,
        prompt: &str,
        prior_history: &[StoredMessage],
        events: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let snapshot = self.registry.snapshot();

        let plan = if doc.supervisor_mode {
            let analyzer =
                QueryAnalyzer::new(&snapshot, &self.knowledge, &self.config.default_agent);
            match analyzer.analyze(prompt) {
                Ok(exec) => {
                    let decision = StoredMessage::supervisor_decision(
                        exec.describe(),
                        exec.primary_agent.clone(),
                    );
                    self.record(doc, events, decision).await;
                    planner::from_execution_plan(&exec)
                }
                Err(e) => {
                    tracing::warn!("supervisor analysis failed, using default agent: {e}");
                    let advisory = StoredMessage::supervisor(format!(
                        "Analysis unavailable ({e}); continuing with {}",
                        self.config.default_agent
                    ));
                    self.record(doc, events, advisory).await;
                    Plan {
                        steps: vec![Step::Agent {
                            agent_id: self.config.default_agent.clone(),
                        }],
                        warnings: Vec::new(),
                        context_fusion: None,
                        primary_agent: Some(self.config.default_agent.clone()),
                        supervisor: true,
                    }
                }
            }
        } else {
            let plan = planner::from_manual(&doc.agent_sequence, prompt, &snapshot, &self.knowledge);
            for warning in &plan.warnings {
                self.record(doc, events, StoredMessage::system(warning.clone()))
                    .await;
            }
            plan
        };

        if plan.agent_count() == 0 {
            return Err(CoreError::NoAgentsEnabled);
        }
        let last_agent_index = plan
            .steps
            .iter()
            .rposition(|s| matches!(s, Step::Agent { .. }))
            .expect("plan has an agent step");

        let via_supervisor = plan.supervisor;
        let mut cache = ToolCache::default();
        let mut reports: Vec<ToolReport> = Vec::new();
        let mut prior_output: Option<(String, String)> = None;
        let mut agent_outputs: HashMap<String, String> = HashMap::new();

        for (index, step) in plan.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            match step {
                Step::Tool {
                    tool_id,
                    option,
                    for_agent,
                } => {
                    let outcome = self
                        .tools
                        .maybe_run(&mut cache, tool_id, prompt, option.as_deref(), for_agent)
                        .await;
                    match outcome {
                        ToolOutcome::Used(report) => {
                            let msg = StoredMessage::tool(
                                &report.tool_id,
                                &report.text,
                                &report.for_agent,
                                via_supervisor,
                                false,
                            );
                            self.record(doc, events, msg).await;
                            reports.push(report);
                        }
                        ToolOutcome::Skipped { reason } => {
                            tracing::debug!(tool = %tool_id, %reason, "tool skipped");
                        }
                        ToolOutcome::Failed { query, error } => {
                            tracing::warn!(tool = %tool_id, %query, "tool failed: {error}");
                            let msg =
                                StoredMessage::tool(tool_id, &error, for_agent, via_supervisor, true);
                            self.record(doc, events, msg).await;
                        }
                    }
                }
                Step::Delegation {
                    message,
                    target_agent,
                } => {
                    let mut msg = StoredMessage::supervisor(message.clone());
                    msg.chosen_agent = Some(target_agent.clone());
                    self.record(doc, events, msg).await;
                }
                Step::Agent { agent_id } => {
                    let definition = snapshot
                        .get(agent_id)
                        .cloned()
                        .ok_or_else(|| CoreError::Plan(format!("unknown agent '{agent_id}'")))?;

                    send(events, StreamEvent::stream_start(agent_id)).await;
                    let ctx = AgentContext {
                        definition: &definition,
                        user_prompt: prompt,
                        tool_reports: &reports,
                        prior_output: prior_output
                            .as_ref()
                            .map(|(a, t)| (a.as_str(), t.as_str())),
                        fusion: plan.context_fusion,
                        history: prior_history,
                        history_window: self.config.history_window,
                    };

                    match self.stream_agent(agent_id, &ctx, events, cancel).await {
                        Ok(text) => {
                            send(events, StreamEvent::stream_end(agent_id, &text, false)).await;
                            doc.history
                                .push(StoredMessage::agent(agent_id, &text, via_supervisor));
                            agent_outputs.insert(agent_id.clone(), text.clone());
                            prior_output = Some((agent_id.clone(), text));
                            if via_supervisor && index != last_agent_index {
                                self.record(
                                    doc,
                                    events,
                                    StoredMessage::supervisor(format!(
                                        "Received output from {agent_id}, proceeding to next step..."
                                    )),
                                )
                                .await;
                            }
                        }
                        Err(CoreError::Cancelled) => {
                            // Pair the open stream_start so the client can
                            // clear its placeholder, then go silent.
                            send(events, StreamEvent::stream_end(agent_id, "", true)).await;
                            return Err(CoreError::Cancelled);
                        }
                        Err(e) => {
                            send(events, StreamEvent::stream_end(agent_id, "", true)).await;
                            if index == last_agent_index {
                                return Err(CoreError::Provider(format!(
                                    "agent '{agent_id}' failed: {e}"
                                )));
                            }
                            // A non-primary failure does not abort the turn.
                            self.record(
                                doc,
                                events,
                                StoredMessage::system_error(format!(
                                    "agent '{agent_id}' failed: {e}"
                                )),
                            )
                            .await;
                            prior_output = None;
                        }
                    }
                }
            }
        }

        if via_supervisor {
            if let Some(primary) = plan.primary_agent.as_deref() {
                if agent_outputs.contains_key(primary) {
                    let ack = if plan.agent_count() > 1 {
                        format!("Multi-agent workflow completed. Final response from {primary}.")
                    } else {
                        format!("Workflow completed. Final response from {primary}.")
                    };
                    self.record(doc, events, StoredMessage::supervisor(ack)).await;
                }
            }
        }

        Ok(())
    }

    /// Drive one agent's token stream, forwarding chunks as frames.
    async fn stream_agent(
        &self,
        agent_id: &str,
        ctx: &AgentContext<'_>,
        events: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<String, CoreError> {
        let mut rx = tokio::select! {
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            started = self.runner.run_streaming(ctx) => started?,
        };

        let mut text = String::new();
        let deadline = tokio::time::sleep(self.config.agent_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(CoreError::Cancelled),
                _ = &mut deadline => {
                    return Err(CoreError::Provider(format!(
                        "agent call timed out after {} seconds",
                        self.config.agent_timeout.as_secs()
                    )));
                }
                part = rx.recv() => match part {
                    Some(StreamPart::TextDelta { delta }) => {
                        text.push_str(&delta);
                        send(events, StreamEvent::stream_chunk(agent_id, delta)).await;
                    }
                    Some(StreamPart::Finish) | None => break,
                    Some(StreamPart::Error { error }) => return Err(CoreError::Provider(error)),
                },
            }
        }
        Ok(text)
    }

    /// Append a message to the turn history and mirror it on the stream.
    async fn record(
        &self,
        doc: &mut SessionDoc,
        events: &mpsc::Sender<StreamEvent>,
        msg: StoredMessage,
    ) {
        send(events, StreamEvent::from_message(&msg)).await;
        doc.history.push(msg);
    }
}

async fn send(events: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    events.send(event).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::providers::{ChatRequest, LlmProvider, SearchProvider};
    use crate::session::{PlanEntry, ToolBinding};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CATALOG: &str = r#"{
        "agents": {
            "granny": {"id": "granny", "name": "Granny",
                       "system_prompt": "GRANNY_PROMPT",
                       "capabilities": ["cultural", "storytelling", "recipes"],
                       "routing_keywords": ["granny", "grandma", "traditional", "romanian"]},
            "story_creator": {"id": "story_creator", "name": "Story Creator",
                              "system_prompt": "STORY_PROMPT",
                              "capabilities": ["storytelling", "creative_writing"],
                              "routing_keywords": ["story", "tale", "tell"]},
            "parody_creator": {"id": "parody_creator", "name": "Parody Creator",
                               "system_prompt": "PARODY_PROMPT",
                               "capabilities": ["humor", "parody", "comedy"],
                               "routing_keywords": ["funny", "parody", "joke"]},
            "data_analyst": {"id": "data_analyst", "name": "Data Analyst",
                             "system_prompt": "ANALYST_PROMPT",
                             "capabilities": ["analysis", "research", "data"],
                             "routing_keywords": ["analyze", "data", "statistics"]}
        }
    }"#;

    const KNOWLEDGE: &str = r#"{
        "ciorba": {
            "label": "Ciorba radauteana",
            "keywords": ["ciorba", "soup", "reteta"],
            "content": "Ciorba radauteana: sour chicken soup with cream and garlic."
        }
    }"#;

    /// Scripted LLM: answers with a marker derived from the system prompt,
    /// optionally failing for one agent.
    struct ScriptedLlm {
        fail_marker: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn stream_chat(
            &self,
            request: ChatRequest,
        ) -> Result<tokio::sync::mpsc::UnboundedReceiver<StreamPart>, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            if let Some(marker) = &self.fail_marker {
                if request.system.contains(marker) {
                    let _ = tx.send(StreamPart::Error {
                        error: "provider unavailable".into(),
                    });
                    return Ok(rx);
                }
            }
            let _ = tx.send(StreamPart::TextDelta {
                delta: format!("answer from {}", request.system),
            });
            let _ = tx.send(StreamPart::Finish);
            Ok(rx)
        }
    }

    struct StubSearch;

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(&self, query: &str) -> Result<String, CoreError> {
            Ok(format!("• Search results for {query}"))
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SearchProvider for FailingSearch {
        async fn search(&self, _query: &str) -> Result<String, CoreError> {
            Err(CoreError::Provider("search backend down".into()))
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        store: Arc<SessionStore>,
        llm_calls: Arc<ScriptedLlm>,
        _dir: tempfile::TempDir,
    }

    fn fixture(fail_marker: Option<&str>, search: Option<Arc<dyn SearchProvider>>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::open(dir.path()).unwrap());
        let registry = Arc::new(AgentRegistry::from_catalog(Catalog::parse(CATALOG).unwrap()));
        let knowledge =
            Arc::new(KnowledgeBase::parse(KNOWLEDGE, PathBuf::from(".")).unwrap());
        let tools = Arc::new(ToolRuntime::new(
            search,
            knowledge.clone(),
            Duration::from_secs(15),
        ));
        let llm = Arc::new(ScriptedLlm {
            fail_marker: fail_marker.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let orchestrator = Orchestrator::new(
            registry,
            knowledge,
            tools,
            AgentRunner::new(llm.clone()),
            store.clone(),
            RuntimeConfig::default(),
        );
        Fixture {
            orchestrator,
            store,
            llm_calls: llm,
            _dir: dir,
        }
    }

    async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut frames = Vec::new();
        while let Some(ev) = rx.recv().await {
            frames.push(ev);
        }
        frames
    }

    fn assert_stream_pairs(frames: &[StreamEvent]) {
        let starts = frames.iter().filter(|f| f.stream_start == Some(true)).count();
        let ends = frames.iter().filter(|f| f.stream_end == Some(true)).count();
        assert_eq!(starts, ends, "every stream_start must pair with a stream_end");
    }

    #[tokio::test]
    async fn manual_recipe_turn_commits_user_tool_agent() {
        let f = fixture(None, None);
        let mut doc = f.store.create().await.unwrap();
        doc.agent_sequence.push(PlanEntry {
            id: "granny".into(),
            enabled: true,
            tools: vec![ToolBinding::Configured {
                name: "knowledgebase".into(),
                option: Some("ciorba".into()),
            }],
        });
        f.store.put(&doc.id, &doc).await.unwrap();

        let (tx, rx) = mpsc::channel(64);
        let messages = f
            .orchestrator
            .run_turn(
                &doc.id,
                "How do I make traditional Romanian ciorba?",
                &tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        drop(tx);
        let frames = drain(rx).await;

        // user + tool + granny
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].sender, "user");
        assert_eq!(messages[1].sender, "tool");
        assert_eq!(messages[1].tool_id.as_deref(), Some("knowledgebase"));
        assert!(messages[1].text.contains("sour chicken soup"));
        assert_eq!(messages[2].sender, "granny");

        let tool_frames: Vec<_> = frames.iter().filter(|f| f.sender == "tool").collect();
        assert_eq!(tool_frames.len(), 1);
        assert_stream_pairs(&frames);

        let stored = f.store.get(&doc.id).unwrap().unwrap();
        assert_eq!(stored.history.len(), 3);
    }

    #[tokio::test]
    async fn supervisor_humor_routing_has_decision_and_ack() {
        let f = fixture(None, None);
        let mut doc = f.store.create().await.unwrap();
        doc.supervisor_mode = true;
        f.store.put(&doc.id, &doc).await.unwrap();

        let (tx, rx) = mpsc::channel(64);
        let messages = f
            .orchestrator
            .run_turn(
                &doc.id,
                "Make a funny parody of LinkedIn posts",
                &tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        drop(tx);
        let frames = drain(rx).await;

        let decision = frames
            .iter()
            .find(|f| f.routing_decision == Some(true))
            .expect("decision frame");
        assert_eq!(decision.chosen_agent.as_deref(), Some("parody_creator"));
        assert!(decision.text.as_deref().unwrap().contains("sequential"));

        assert!(frames.iter().all(|f| f.sender != "tool"));
        assert_stream_pairs(&frames);

        let last = messages.last().unwrap();
        assert_eq!(last.sender, "supervisor");
        assert!(last.text.contains("parody_creator"));
    }

    #[tokio::test]
    async fn multi_agent_sequence_runs_both_agents_in_order() {
        let f = fixture(None, Some(Arc::new(StubSearch)));
        let mut doc = f.store.create().await.unwrap();
        doc.supervisor_mode = true;
        f.store.put(&doc.id, &doc).await.unwrap();

        let (tx, rx) = mpsc::channel(128);
        let messages = f
            .orchestrator
            .run_turn(
                &doc.id,
                "Analyze weather in Bucharest last week and let granny tell me about it",
                &tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        drop(tx);
        let frames = drain(rx).await;

        let agent_ends: Vec<&str> = frames
            .iter()
            .filter(|f| f.stream_end == Some(true))
            .map(|f| f.sender.as_str())
            .collect();
        assert_eq!(agent_ends, vec!["data_analyst", "granny"]);

        let delegations: Vec<_> = messages
            .iter()
            .filter(|m| m.sender == "supervisor" && m.text.starts_with("Delegating"))
            .collect();
        assert_eq!(delegations.len(), 2);

        let ack = messages.last().unwrap();
        assert!(ack.text.contains("granny"));
        assert!(ack.text.contains("completed"));
        assert_stream_pairs(&frames);
    }

    #[tokio::test]
    async fn second_agent_failure_preserves_first_output() {
        let f = fixture(Some("GRANNY_PROMPT"), Some(Arc::new(StubSearch)));
        let mut doc = f.store.create().await.unwrap();
        doc.supervisor_mode = true;
        f.store.put(&doc.id, &doc).await.unwrap();

        let (tx, rx) = mpsc::channel(128);
        let messages = f
            .orchestrator
            .run_turn(
                &doc.id,
                "Analyze weather in Bucharest last week and let granny tell me about it",
                &tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        drop(tx);
        let frames = drain(rx).await;

        // analyst output committed, turn closed by a single system error
        assert!(messages.iter().any(|m| m.sender == "data_analyst"));
        let last = messages.last().unwrap();
        assert_eq!(last.sender, "system");
        assert_eq!(last.error, Some(true));
        assert!(last.text.contains("granny"));
        // no supervisor ack after a failed primary
        assert!(!messages
            .iter()
            .any(|m| m.sender == "supervisor" && m.text.contains("workflow completed")));
        assert_stream_pairs(&frames);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_invoking_agents() {
        let f = fixture(None, None);
        let doc = f.store.create().await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let err = f
            .orchestrator
            .run_turn(&doc.id, "   ", &tx, CancellationToken::new())
            .await
            .unwrap_err();
        drop(tx);
        let frames = drain(rx).await;

        assert!(matches!(err, CoreError::EmptyPrompt));
        assert_eq!(f.llm_calls.calls.load(Ordering::SeqCst), 0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sender, "system");
        // history untouched
        assert!(f.store.get(&doc.id).unwrap().unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn tool_failure_still_runs_dependent_agent() {
        let f = fixture(None, Some(Arc::new(FailingSearch)));
        let mut doc = f.store.create().await.unwrap();
        doc.agent_sequence.push(PlanEntry {
            id: "story_creator".into(),
            enabled: true,
            tools: vec![ToolBinding::Bare("web_search".into())],
        });
        f.store.put(&doc.id, &doc).await.unwrap();

        let (tx, rx) = mpsc::channel(64);
        let messages = f
            .orchestrator
            .run_turn(&doc.id, "what is the latest news today", &tx, CancellationToken::new())
            .await
            .unwrap();
        drop(tx);
        let frames = drain(rx).await;

        let tool_frame = frames.iter().find(|f| f.sender == "tool").unwrap();
        assert_eq!(tool_frame.error, Some(true));
        assert!(messages.iter().any(|m| m.sender == "story_creator"));
        assert_stream_pairs(&frames);
    }

    #[tokio::test]
    async fn no_enabled_agents_ends_with_system_error() {
        let f = fixture(None, None);
        let doc = f.store.create().await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let messages = f
            .orchestrator
            .run_turn(&doc.id, "hello there", &tx, CancellationToken::new())
            .await
            .unwrap();
        drop(tx);
        let _ = drain(rx).await;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, "system");
        assert_eq!(messages[1].error, Some(true));
    }

    #[tokio::test]
    async fn pre_cancelled_turn_commits_terminal_marker() {
        let f = fixture(None, None);
        let mut doc = f.store.create().await.unwrap();
        doc.supervisor_mode = true;
        f.store.put(&doc.id, &doc).await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let (tx, rx) = mpsc::channel(8);
        let err = f
            .orchestrator
            .run_turn(&doc.id, "tell me a story", &tx, token)
            .await
            .unwrap_err();
        drop(tx);
        let _ = drain(rx).await;

        assert!(matches!(err, CoreError::Cancelled));
        let stored = f.store.get(&doc.id).unwrap().unwrap();
        let last = stored.history.last().unwrap();
        assert!(last.text.contains("cancelled"));
        assert_eq!(last.error, Some(true));
    }

    #[tokio::test]
    async fn supervisor_off_follows_manual_plan() {
        let f = fixture(None, None);
        let mut doc = f.store.create().await.unwrap();
        doc.supervisor_mode = false;
        doc.agent_sequence.push(PlanEntry {
            id: "story_creator".into(),
            enabled: true,
            tools: vec![],
        });
        f.store.put(&doc.id, &doc).await.unwrap();

        let (tx, rx) = mpsc::channel(64);
        let messages = f
            .orchestrator
            .run_turn(
                &doc.id,
                "Make a funny parody of LinkedIn posts",
                &tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        drop(tx);
        let _ = drain(rx).await;

        // manual plan wins: story_creator answers, no supervisor frames
        assert!(messages.iter().any(|m| m.sender == "story_creator"));
        assert!(!messages.iter().any(|m| m.sender == "supervisor"));
    }
}

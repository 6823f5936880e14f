//! Tool runtime.
//!
//! Decides per tool whether the prompt warrants a call, generates a focused
//! query, executes with a bounded timeout, and caches results for the
//! duration of one turn so identical inputs never hit a provider twice.

pub mod query;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::analyzer::entities::extract_entities;
use crate::knowledge::KnowledgeBase;
use crate::providers::SearchProvider;

pub use query::{compose_knowledge_query, compose_search_query};

pub const WEB_SEARCH: &str = "web_search";
pub const KNOWLEDGEBASE: &str = "knowledgebase";

/// Prompt cues that make `web_search` relevant.
const WEB_SEARCH_TRIGGERS: &[&str] = &[
    "today", "current", "now", "latest", "recent", "news", "weather", "temperature", "forecast",
    "happening", "price", "stock", "update",
];

/// Whether the prompt carries temporal or current-information cues.
pub fn has_web_cues(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    WEB_SEARCH_TRIGGERS.iter().any(|t| lower.contains(t))
}

/// Static description of one tool, surfaced on `/tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolMetadata {
    pub id: String,
    pub description: String,
    pub use_cases: Vec<String>,
    pub input_format: String,
    /// Advisory only; the runtime does not gate on it.
    pub confidence_threshold: f32,
    pub fallback_behavior: String,
}

/// The two built-in tools.
pub fn builtin_tools() -> Vec<ToolMetadata> {
    vec![
        ToolMetadata {
            id: WEB_SEARCH.into(),
            description: "Searches the internet for current information, news, weather, facts, \
                          and real-time data. Use when you need up-to-date information that \
                          changes frequently."
                .into(),
            use_cases: vec![
                "current weather conditions".into(),
                "recent news and events".into(),
                "real-time data and statistics".into(),
                "current prices and market info".into(),
            ],
            input_format: "A specific, focused search query containing only the essential \
                           search terms."
                .into(),
            confidence_threshold: 0.8,
            fallback_behavior: "inform_user_no_results".into(),
        },
        ToolMetadata {
            id: KNOWLEDGEBASE.into(),
            description: "Accesses curated knowledge files with detailed stored information \
                          about specific topics."
                .into(),
            use_cases: vec![
                "recipe information and cooking instructions".into(),
                "detailed procedural knowledge".into(),
                "stored reference materials".into(),
            ],
            input_format: "A specific, direct question about the content you need.".into(),
            confidence_threshold: 0.7,
            fallback_behavior: "suggest_alternative_source".into(),
        },
    ]
}

/// A successful tool execution.
#[derive(Debug, Clone, Serialize)]
pub struct ToolReport {
    pub tool_id: String,
    /// The generated query sent to the provider.
    pub query: String,
    /// Result text shown to agents and the client.
    pub text: String,
    /// The agent this tool ran for.
    pub for_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Outcome of `maybe_run`.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Used(ToolReport),
    Skipped { reason: String },
    Failed { query: String, error: String },
}

/// Turn-local result cache. Never shared across turns or sessions.
#[derive(Default)]
pub struct ToolCache {
    entries: HashMap<(String, String, Option<String>), ToolOutcome>,
}

pub struct ToolRuntime {
    search: Option<Arc<dyn SearchProvider>>,
    knowledge: Arc<KnowledgeBase>,
    timeout: Duration,
}

impl ToolRuntime {
    pub fn new(
        search: Option<Arc<dyn SearchProvider>>,
        knowledge: Arc<KnowledgeBase>,
        timeout: Duration,
    ) -> Self {
        Self {
            search,
            knowledge,
            timeout,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Decide relevance, generate a query, and execute the tool.
    ///
    /// Identical inputs within one turn return the cached outcome.
    pub async fn maybe_run(
        &self,
        cache: &mut ToolCache,
        tool_id: &str,
        prompt: &str,
        option: Option<&str>,
        for_agent: &str,
    ) -> ToolOutcome {
        let key = (
            tool_id.to_string(),
            prompt.to_string(),
            option.map(str::to_string),
        );
        if let Some(cached) = cache.entries.get(&key) {
            return cached.clone();
        }

        let outcome = match tool_id {
            WEB_SEARCH => self.run_web_search(prompt, for_agent).await,
            KNOWLEDGEBASE => self.run_knowledgebase(prompt, option, for_agent),
            other => ToolOutcome::Failed {
                query: prompt.to_string(),
                error: format!("unknown tool '{other}'"),
            },
        };

        cache.entries.insert(key, outcome.clone());
        outcome
    }

    async fn run_web_search(&self, prompt: &str, for_agent: &str) -> ToolOutcome {
        if !has_web_cues(prompt) {
            return ToolOutcome::Skipped {
                reason: "no current-information cues in prompt".into(),
            };
        }
        let Some(search) = &self.search else {
            return ToolOutcome::Skipped {
                reason: "web search disabled: no search API key configured".into(),
            };
        };

        let entities = extract_entities(prompt);
        let query = compose_search_query(prompt, &entities);

        match tokio::time::timeout(self.timeout, search.search(&query)).await {
            Ok(Ok(text)) => {
                let confidence = if text.contains("No search results") {
                    0.2
                } else {
                    0.8
                };
                ToolOutcome::Used(ToolReport {
                    tool_id: WEB_SEARCH.into(),
                    query,
                    text,
                    for_agent: for_agent.into(),
                    confidence: Some(confidence),
                })
            }
            Ok(Err(e)) => ToolOutcome::Failed {
                query,
                error: e.to_string(),
            },
            Err(_) => ToolOutcome::Failed {
                query,
                error: format!(
                    "web search timed out after {} seconds",
                    self.timeout.as_secs()
                ),
            },
        }
    }

    fn run_knowledgebase(
        &self,
        prompt: &str,
        option: Option<&str>,
        for_agent: &str,
    ) -> ToolOutcome {
        let key = match option {
            Some(key) => {
                if self.knowledge.get(key).is_none() {
                    return ToolOutcome::Failed {
                        query: prompt.to_string(),
                        error: format!("unknown knowledge key '{key}'"),
                    };
                }
                key.to_string()
            }
            None => match self.knowledge.match_key(prompt) {
                Some(key) => key,
                None => {
                    return ToolOutcome::Skipped {
                        reason: "no knowledge key matches the prompt".into(),
                    }
                }
            },
        };

        // Conservative even with an explicit binding: at least one domain
        // term must appear in the prompt.
        if self.knowledge.match_keys(prompt).iter().all(|k| *k != key) {
            return ToolOutcome::Skipped {
                reason: format!("prompt has no domain cues for '{key}'"),
            };
        }

        let query = compose_knowledge_query(prompt);
        let body = match self.knowledge.fetch(&key) {
            Ok(body) => body,
            Err(e) => {
                return ToolOutcome::Failed {
                    query,
                    error: e.to_string(),
                }
            }
        };

        let text = filter_knowledge_body(&query, &body);
        ToolOutcome::Used(ToolReport {
            tool_id: KNOWLEDGEBASE.into(),
            query,
            text,
            for_agent: for_agent.into(),
            confidence: None,
        })
    }
}

/// For specific queries, require at least one shared word with the body;
/// generic queries return the whole document.
fn filter_knowledge_body(query: &str, body: &str) -> String {
    let query_words: Vec<String> = query
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.len() > 2)
        .collect();

    if query_words.len() <= 1 {
        return body.to_string();
    }

    let body_lower = body.to_lowercase();
    if query_words.iter().any(|w| body_lower.contains(w)) {
        body.to_string()
    } else {
        "No relevant information found".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSearch {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SearchProvider for CountingSearch {
        async fn search(&self, query: &str) -> Result<String, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CoreError::Provider("search backend down".into()))
            } else {
                Ok(format!("• Result for {query}\nhttps://example.com\nsnippet..."))
            }
        }
    }

    fn knowledge() -> Arc<KnowledgeBase> {
        Arc::new(
            KnowledgeBase::parse(
                r#"{
                "ciorba": {
                    "label": "Ciorba radauteana",
                    "keywords": ["ciorba", "soup", "reteta"],
                    "content": "Ciorba radauteana: sour soup with chicken and cream."
                }
            }"#,
                PathBuf::from("."),
            )
            .unwrap(),
        )
    }

    fn runtime(fail: bool) -> (ToolRuntime, Arc<CountingSearch>) {
        let search = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            fail,
        });
        let rt = ToolRuntime::new(
            Some(search.clone()),
            knowledge(),
            Duration::from_secs(15),
        );
        (rt, search)
    }

    #[tokio::test]
    async fn web_search_skipped_without_cues() {
        let (rt, search) = runtime(false);
        let mut cache = ToolCache::default();
        let outcome = rt
            .maybe_run(&mut cache, WEB_SEARCH, "tell me a story", None, "granny")
            .await;
        assert!(matches!(outcome, ToolOutcome::Skipped { .. }));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn web_search_runs_with_focused_query() {
        let (rt, _) = runtime(false);
        let mut cache = ToolCache::default();
        let outcome = rt
            .maybe_run(
                &mut cache,
                WEB_SEARCH,
                "What's the weather in Bucharest today?",
                None,
                "granny",
            )
            .await;
        let ToolOutcome::Used(report) = outcome else {
            panic!("expected Used");
        };
        assert!(report.query.contains("Bucharest"));
        assert!(report.query.contains("today"));
        assert_eq!(report.for_agent, "granny");
    }

    #[tokio::test]
    async fn identical_calls_within_turn_hit_cache() {
        let (rt, search) = runtime(false);
        let mut cache = ToolCache::default();
        let prompt = "latest news today";
        let first = rt
            .maybe_run(&mut cache, WEB_SEARCH, prompt, None, "a")
            .await;
        let second = rt
            .maybe_run(&mut cache, WEB_SEARCH, prompt, None, "a")
            .await;
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        match (first, second) {
            (ToolOutcome::Used(a), ToolOutcome::Used(b)) => {
                assert_eq!(a.text, b.text);
                assert_eq!(a.query, b.query);
            }
            _ => panic!("expected Used outcomes"),
        }
    }

    #[tokio::test]
    async fn provider_error_is_surfaced_as_failed() {
        let (rt, _) = runtime(true);
        let mut cache = ToolCache::default();
        let outcome = rt
            .maybe_run(&mut cache, WEB_SEARCH, "weather today", None, "a")
            .await;
        let ToolOutcome::Failed { error, .. } = outcome else {
            panic!("expected Failed");
        };
        assert!(error.contains("search backend down"));
    }

    #[tokio::test]
    async fn web_search_without_provider_is_skipped() {
        let rt = ToolRuntime::new(None, knowledge(), Duration::from_secs(15));
        let mut cache = ToolCache::default();
        let outcome = rt
            .maybe_run(&mut cache, WEB_SEARCH, "weather today", None, "a")
            .await;
        assert!(matches!(outcome, ToolOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn knowledgebase_with_option_returns_body() {
        let (rt, _) = runtime(false);
        let mut cache = ToolCache::default();
        let outcome = rt
            .maybe_run(
                &mut cache,
                KNOWLEDGEBASE,
                "How do I make traditional Romanian ciorba?",
                Some("ciorba"),
                "granny",
            )
            .await;
        let ToolOutcome::Used(report) = outcome else {
            panic!("expected Used");
        };
        assert!(report.text.contains("sour soup"));
        assert_eq!(report.tool_id, KNOWLEDGEBASE);
    }

    #[tokio::test]
    async fn knowledgebase_skips_unrelated_prompt() {
        let (rt, _) = runtime(false);
        let mut cache = ToolCache::default();
        let outcome = rt
            .maybe_run(&mut cache, KNOWLEDGEBASE, "weather in Paris", None, "a")
            .await;
        assert!(matches!(outcome, ToolOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn knowledgebase_unknown_option_fails() {
        let (rt, _) = runtime(false);
        let mut cache = ToolCache::default();
        let outcome = rt
            .maybe_run(&mut cache, KNOWLEDGEBASE, "ciorba", Some("missing"), "a")
            .await;
        assert!(matches!(outcome, ToolOutcome::Failed { .. }));
    }

    #[test]
    fn generic_query_returns_full_body() {
        assert_eq!(filter_knowledge_body("details", "Body text"), "Body text");
    }

    #[test]
    fn specific_query_without_overlap_is_empty() {
        let out = filter_knowledge_body("How to repair engines?", "Ciorba recipe body");
        assert_eq!(out, "No relevant information found");
    }
}

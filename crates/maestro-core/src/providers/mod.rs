//! Provider ports.
//!
//! The LLM and web-search backends are consumed through these narrow
//! capabilities. Implementations live next to the traits; tests inject
//! mocks.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;

mod llm;
mod search;

pub use llm::OpenAiChatProvider;
pub use search::TavilySearchProvider;

/// One composed LLM call: system prompt plus a single flattened user turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system: String,
    pub prompt: String,
}

/// Streamed output of an LLM call.
#[derive(Debug, Clone)]
pub enum StreamPart {
    TextDelta { delta: String },
    Finish,
    Error { error: String },
}

/// Streaming chat-completion capability.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Start a streaming completion. Parts arrive on the returned channel;
    /// the stream ends with `Finish` or `Error`.
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, CoreError>;
}

/// Web search capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a search and return formatted result text.
    async fn search(&self, query: &str) -> Result<String, CoreError>;
}

//! OpenAI-compatible streaming chat client.
//!
//! Speaks the `/chat/completions` SSE protocol. The reader task parses
//! `data:` lines off the byte stream and forwards text deltas; callers drain
//! the channel until `Finish` or `Error`.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::error::CoreError;

use super::{ChatRequest, LlmProvider, StreamPart};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiChatProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiChatProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiChatProvider {
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, CoreError> {
        let body = json!({
            "model": request.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": true,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("LLM request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(CoreError::Provider(format!(
                "LLM returned {status}: {detail}"
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(StreamPart::Error {
                            error: format!("LLM stream error: {e}"),
                        });
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                        continue;
                    };
                    if data == "[DONE]" {
                        let _ = tx.send(StreamPart::Finish);
                        return;
                    }
                    match serde_json::from_str::<Value>(data) {
                        Ok(event) => {
                            if let Some(delta) = event["choices"][0]["delta"]["content"].as_str() {
                                if !delta.is_empty() {
                                    let _ = tx.send(StreamPart::TextDelta {
                                        delta: delta.to_string(),
                                    });
                                }
                            }
                        }
                        Err(e) => {
                            tracing::debug!("unparseable SSE data line: {e}");
                        }
                    }
                }
            }
            // Stream closed without [DONE]; treat as a normal finish.
            let _ = tx.send(StreamPart::Finish);
        });

        Ok(rx)
    }
}

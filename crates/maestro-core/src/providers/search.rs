//! Web search via the Tavily HTTP API.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::CoreError;

use super::SearchProvider;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: usize = 3;
const SNIPPET_LEN: usize = 250;

pub struct TavilySearchProvider {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl TavilySearchProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: TAVILY_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    async fn search(&self, query: &str) -> Result<String, CoreError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "search_depth": "basic",
                "max_results": MAX_RESULTS,
            }))
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Provider(format!(
                "search API returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CoreError::Provider(format!("failed to parse search results: {e}")))?;

        Ok(format_search_results(&body))
    }
}

/// Format provider results as bulleted `title / url / snippet` entries.
fn format_search_results(body: &Value) -> String {
    let Some(results) = body["results"].as_array().filter(|r| !r.is_empty()) else {
        return "No search results found".to_string();
    };

    let entries: Vec<String> = results
        .iter()
        .take(MAX_RESULTS)
        .map(|r| {
            let title = r["title"].as_str().unwrap_or("No title");
            let url = r["url"].as_str().unwrap_or("");
            let content: String = r["content"]
                .as_str()
                .unwrap_or("No content")
                .chars()
                .take(SNIPPET_LEN)
                .collect();
            format!("• {title}\n{url}\n{content}...")
        })
        .collect();

    entries.join("\n\n")
}

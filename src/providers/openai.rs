//! OpenAI chat-completions client for the synthesis stage
//!
//! Tool-enabled requests go to the search-preview model; the fallback
//! path reuses the same client with `web_search` cleared.

use super::{ChatProvider, ChatRequest};
use crate::error::ResearchError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const CHAT_MODEL: &str = "gpt-4o";
const SEARCH_MODEL: &str = "gpt-4o-search-preview";

/// Reusable OpenAI client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionRequest {
            model: if request.web_search {
                SEARCH_MODEL
            } else {
                CHAT_MODEL
            }
            .to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            max_tokens: request.max_tokens,
            // Search-preview models reject a temperature parameter.
            temperature: (!request.web_search).then_some(request.temperature),
            web_search_options: request.web_search.then(WebSearchOptions::default),
        };

        debug!(web_search = request.web_search, "Calling OpenAI API");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {}", e);
                ResearchError::Provider(format!("OpenAI request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI error response ({}): {}", status, error_text);
            return Err(ResearchError::Provider(format!(
                "OpenAI returned {}: {}",
                status, error_text
            )));
        }

        let reply: CompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse OpenAI response: {}", e);
            ResearchError::Provider(format!("OpenAI parse error: {}", e))
        })?;

        reply
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ResearchError::Provider("Empty response from OpenAI".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_search_options: Option<WebSearchOptions>,
}

#[derive(Debug, Default, Serialize)]
struct WebSearchOptions {}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

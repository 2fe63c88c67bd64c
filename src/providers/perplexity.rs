//! Perplexity sonar client for search-grounded research
//!
//! Each facet fetch is one chat-completion call with a recency filter.
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{ProviderReply, SearchProvider};
use crate::error::ResearchError;
use crate::facets::Recency;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_MODEL: &str = "sonar";

/// Reusable Perplexity client (connection-pooled)
pub struct PerplexityClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl PerplexityClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://api.perplexity.ai/chat/completions".to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for PerplexityClient {
    async fn research(&self, query: &str, system: &str, recency: Recency) -> Result<ProviderReply> {
        let request = SonarRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: query.to_string(),
                },
            ],
            search_recency_filter: recency.as_filter().to_string(),
            max_tokens: 2048,
            temperature: 0.2,
        };

        debug!(recency = recency.as_filter(), "Calling Perplexity API");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Perplexity request failed: {}", e);
                ResearchError::Provider(format!("Perplexity request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Perplexity error response ({}): {}", status, error_text);
            return Err(ResearchError::Provider(format!(
                "Perplexity returned {}: {}",
                status, error_text
            )));
        }

        let reply: SonarResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Perplexity response: {}", e);
            ResearchError::Provider(format!("Perplexity parse error: {}", e))
        })?;

        let content = reply
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ResearchError::Provider("Empty response from Perplexity".to_string()))?;

        Ok(ProviderReply {
            content,
            citations: reply.citations.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SonarRequest {
    model: String,
    messages: Vec<Message>,
    search_recency_filter: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct SonarResponse {
    choices: Vec<Choice>,
    citations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = SonarRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: "LIC IPO grey market premium".to_string(),
            }],
            search_recency_filter: Recency::Day.as_filter().to_string(),
            max_tokens: 2048,
            temperature: 0.2,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"search_recency_filter\":\"day\""));
        assert!(json.contains("LIC IPO grey market premium"));
    }

    #[test]
    fn test_response_with_citations_parses() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "GMP is 12."}}],
            "citations": ["https://example.com/gmp"]
        }"#;
        let reply: SonarResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.choices[0].message.content, "GMP is 12.");
        assert_eq!(reply.citations.unwrap().len(), 1);
    }

    #[test]
    fn test_response_without_citations_parses() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "x"}}]}"#;
        let reply: SonarResponse = serde_json::from_str(raw).unwrap();
        assert!(reply.citations.is_none());
    }
}

//! Gemini client, selectable as the synthesis backend
//!
//! Tool-enabled requests attach the google_search grounding tool.
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{ChatProvider, ChatRequest};
use crate::error::ResearchError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}?key={}", self.base_url, self.api_key);

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.user.clone(),
                }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: request.system.clone(),
                }],
            },
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: 0.9,
                max_output_tokens: request.max_tokens,
            },
            tools: request.web_search.then(|| {
                vec![ToolConfig {
                    google_search: GoogleSearch {},
                }]
            }),
        };

        debug!(web_search = request.web_search, "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                ResearchError::Provider(format!("Gemini request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini error response ({}): {}", status, error_text);
            return Err(ResearchError::Provider(format!(
                "Gemini returned {}: {}",
                status, error_text
            )));
        }

        let reply: GenerateResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            ResearchError::Provider(format!("Gemini parse error: {}", e))
        })?;

        reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ResearchError::Provider("Empty response from Gemini".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolConfig>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ToolConfig {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grounded_request_serialization() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "Compare Infosys and TCS".to_string(),
                }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: "You are an equity analyst".to_string(),
                }],
            },
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                max_output_tokens: 4096,
            },
            tools: Some(vec![ToolConfig {
                google_search: GoogleSearch {},
            }]),
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("google_search"));
        assert!(json.contains("Compare Infosys and TCS"));
    }

    #[test]
    fn test_plain_request_omits_tools() {
        let body = GenerateRequest {
            contents: vec![],
            system_instruction: SystemInstruction { parts: vec![] },
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                max_output_tokens: 1024,
            },
            tools: None,
        };

        assert!(!serde_json::to_string(&body).unwrap().contains("tools"));
    }
}

//! Provider traits and clients
//!
//! The pipeline talks to two seams: a search-grounded provider that
//! returns text plus citations, and a chat provider used for synthesis.
//! Real clients live in the submodules; mocks keep the pipeline testable
//! without API keys.

use crate::facets::Recency;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod gemini;
pub mod openai;
pub mod perplexity;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use perplexity::PerplexityClient;

/// Raw text plus source URLs from a search-grounded call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderReply {
    pub content: String,
    pub citations: Vec<String>,
}

/// One synthesis call. `web_search` selects the tool-enabled variant;
/// the fallback path reissues the same request with it cleared.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub web_search: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            web_search: false,
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn without_tools(&self) -> Self {
        let mut request = self.clone();
        request.web_search = false;
        request
    }
}

/// Search-grounded research provider (one call per facet).
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn research(&self, query: &str, system: &str, recency: Recency) -> Result<ProviderReply>;
}

/// Chat provider for the synthesis stage.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Mock search provider for development & testing.
///
/// Returns a fixed reply; queries containing a registered marker string
/// simulate a provider outage for that facet.
pub struct MockSearchProvider {
    content: String,
    citations: Vec<String>,
    fail_when_contains: Vec<String>,
}

impl MockSearchProvider {
    pub fn new(content: impl Into<String>, citations: Vec<String>) -> Self {
        Self {
            content: content.into(),
            citations,
            fail_when_contains: Vec::new(),
        }
    }

    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_when_contains.push(marker.into());
        self
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn research(
        &self,
        query: &str,
        _system: &str,
        _recency: Recency,
    ) -> Result<ProviderReply> {
        if self.fail_when_contains.iter().any(|m| query.contains(m)) {
            return Err(crate::error::ResearchError::Provider(
                "simulated search outage".to_string(),
            ));
        }
        Ok(ProviderReply {
            content: self.content.clone(),
            citations: self.citations.clone(),
        })
    }
}

/// Mock chat provider for development & testing.
///
/// Returns a fixed reply and counts tool-enabled vs plain calls so tests
/// can assert the fallback policy actually ran.
pub struct MockChatProvider {
    reply: String,
    fail_with_tools: bool,
    tool_calls: std::sync::atomic::AtomicUsize,
    plain_calls: std::sync::atomic::AtomicUsize,
}

impl MockChatProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail_with_tools: false,
            tool_calls: std::sync::atomic::AtomicUsize::new(0),
            plain_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Make every tool-enabled call fail, forcing the fallback path.
    pub fn failing_with_tools(mut self) -> Self {
        self.fail_with_tools = true;
        self
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn plain_calls(&self) -> usize {
        self.plain_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        if request.web_search {
            self.tool_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if self.fail_with_tools {
                return Err(crate::error::ResearchError::Provider(
                    "simulated tool outage".to_string(),
                ));
            }
        } else {
            self.plain_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
        Ok(self.reply.clone())
    }
}

//! Process-wide provider configuration
//!
//! All API keys and timeout budgets are read once at startup via
//! [`Config::from_env`], which fails fast when a required key is absent.
//! Routes never consult the environment themselves.

use crate::error::ResearchError;
use crate::Result;
use std::env;
use std::time::Duration;

const DEFAULT_RESEARCH_TIMEOUT_SECS: u64 = 45;
const DEFAULT_SYNTHESIS_TIMEOUT_SECS: u64 = 60;
const DEFAULT_FALLBACK_TIMEOUT_SECS: u64 = 25;
const DEFAULT_PORT: u16 = 8080;

/// Which provider backs the synthesis (chat) stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatBackend {
    OpenAi,
    Gemini,
}

/// Timeout budgets for the pipeline stages.
///
/// The fallback budget is the shorter window granted to the retry-without-
/// tools attempt after a search-enabled call fails or times out.
#[derive(Debug, Clone, Copy)]
pub struct Budgets {
    pub research: Duration,
    pub synthesis: Duration,
    pub fallback: Duration,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            research: Duration::from_secs(DEFAULT_RESEARCH_TIMEOUT_SECS),
            synthesis: Duration::from_secs(DEFAULT_SYNTHESIS_TIMEOUT_SECS),
            fallback: Duration::from_secs(DEFAULT_FALLBACK_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub perplexity_api_key: String,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_backend: ChatBackend,
    pub budgets: Budgets,
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Required: `PERPLEXITY_API_KEY`, plus the key for the selected chat
    /// backend (`OPENAI_API_KEY` by default, `GEMINI_API_KEY` when
    /// `CHAT_BACKEND=gemini`).
    pub fn from_env() -> Result<Self> {
        let perplexity_api_key = require_key("PERPLEXITY_API_KEY")?;

        let chat_backend = match env::var("CHAT_BACKEND").as_deref() {
            Ok("gemini") => ChatBackend::Gemini,
            Ok("openai") | Err(_) => ChatBackend::OpenAi,
            Ok(other) => {
                return Err(ResearchError::Config(format!(
                    "Unknown CHAT_BACKEND '{}' (expected 'openai' or 'gemini')",
                    other
                )))
            }
        };

        let openai_api_key = optional_key("OPENAI_API_KEY");
        let gemini_api_key = optional_key("GEMINI_API_KEY");

        match chat_backend {
            ChatBackend::OpenAi if openai_api_key.is_none() => {
                return Err(missing("OPENAI_API_KEY"));
            }
            ChatBackend::Gemini if gemini_api_key.is_none() => {
                return Err(missing("GEMINI_API_KEY"));
            }
            _ => {}
        }

        let budgets = Budgets {
            research: secs_var("RESEARCH_TIMEOUT_SECS", DEFAULT_RESEARCH_TIMEOUT_SECS)?,
            synthesis: secs_var("SYNTHESIS_TIMEOUT_SECS", DEFAULT_SYNTHESIS_TIMEOUT_SECS)?,
            fallback: secs_var("FALLBACK_TIMEOUT_SECS", DEFAULT_FALLBACK_TIMEOUT_SECS)?,
        };

        if budgets.fallback >= budgets.synthesis {
            return Err(ResearchError::Config(
                "FALLBACK_TIMEOUT_SECS must be shorter than SYNTHESIS_TIMEOUT_SECS".to_string(),
            ));
        }

        let port = env::var("PORT")
            .or_else(|_| env::var("API_PORT"))
            .ok()
            .map(|raw| {
                raw.parse::<u16>()
                    .map_err(|_| ResearchError::Config(format!("Invalid port '{}'", raw)))
            })
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            perplexity_api_key,
            openai_api_key,
            gemini_api_key,
            chat_backend,
            budgets,
            port,
        })
    }
}

fn require_key(name: &str) -> Result<String> {
    optional_key(name).ok_or_else(|| missing(name))
}

fn optional_key(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn missing(name: &str) -> ResearchError {
    ResearchError::Config(format!(
        "{} not set. See .env.example for setup instructions",
        name
    ))
}

fn secs_var(name: &str, default: u64) -> Result<Duration> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ResearchError::Config(format!("Invalid {} '{}'", name, raw))),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them in one test so they
    // cannot race each other under the parallel test runner.
    #[test]
    fn test_from_env_validation() {
        env::remove_var("CHAT_BACKEND");
        env::remove_var("PERPLEXITY_API_KEY");
        env::remove_var("OPENAI_API_KEY");
        env::remove_var("GEMINI_API_KEY");
        env::remove_var("PORT");
        env::remove_var("API_PORT");

        let err = Config::from_env().unwrap_err().to_string();
        assert!(err.contains("PERPLEXITY_API_KEY"));

        env::set_var("PERPLEXITY_API_KEY", "pplx-test");
        let err = Config::from_env().unwrap_err().to_string();
        assert!(err.contains("OPENAI_API_KEY"));

        env::set_var("OPENAI_API_KEY", "sk-test");
        let config = Config::from_env().expect("config should load");
        assert_eq!(config.chat_backend, ChatBackend::OpenAi);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.budgets.fallback < config.budgets.synthesis);

        env::set_var("CHAT_BACKEND", "gemini");
        let err = Config::from_env().unwrap_err().to_string();
        assert!(err.contains("GEMINI_API_KEY"));

        env::set_var("GEMINI_API_KEY", "gm-test");
        let config = Config::from_env().expect("config should load");
        assert_eq!(config.chat_backend, ChatBackend::Gemini);

        env::remove_var("CHAT_BACKEND");
        env::remove_var("PERPLEXITY_API_KEY");
        env::remove_var("OPENAI_API_KEY");
        env::remove_var("GEMINI_API_KEY");
    }
}

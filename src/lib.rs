//! AskAlpha research pipeline
//!
//! A research-report service that:
//! - Fans out search-grounded research calls per facet, concurrently
//! - Degrades gracefully when individual facets fail
//! - Synthesizes a schema-validated report, recommendation, or comparison
//! - Retries every tool-enabled model call once without tools
//! - Repairs the JSON that models wrap in fences and prose
//!
//! PIPELINE:
//! REQUEST → FAN-OUT RESEARCH → JOIN → SYNTHESIZE → VALIDATE → RESPOND

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod facets;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod research;
pub mod retry;
pub mod synthesis;

pub use error::Result;

// Re-export common types
pub use config::{Budgets, Config};
pub use models::*;
pub use pipeline::ResearchPipeline;

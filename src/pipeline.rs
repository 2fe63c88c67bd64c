//! Research pipelines behind the four routes
//!
//! Each operation is a fresh, request-scoped run: fan out the facet
//! research, join, synthesize, validate, discard. Nothing is cached and
//! identical concurrent requests each run the full pipeline.

use crate::config::{Budgets, ChatBackend, Config};
use crate::error::ResearchError;
use crate::facets::{COMPARISON_FACETS, FOLLOWUP_RECENCY, IPO_FACETS, STOCK_FACETS};
use crate::models::{
    AssetType, ComparisonOutcome, FollowupAnswer, GeneratedReport, RecommendationBundle,
};
use crate::providers::{
    ChatProvider, ChatRequest, GeminiClient, OpenAiClient, PerplexityClient, SearchProvider,
};
use crate::research::{run_research, ResearchBundle};
use crate::retry::{with_fallback, FallbackBudgets};
use crate::synthesis;
use crate::Result;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct ResearchPipeline {
    search: Arc<dyn SearchProvider>,
    chat: Arc<dyn ChatProvider>,
    budgets: Budgets,
}

impl ResearchPipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        chat: Arc<dyn ChatProvider>,
        budgets: Budgets,
    ) -> Self {
        Self {
            search,
            chat,
            budgets,
        }
    }

    /// Build the pipeline with real provider clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let search: Arc<dyn SearchProvider> =
            Arc::new(PerplexityClient::new(config.perplexity_api_key.clone()));

        let chat: Arc<dyn ChatProvider> = match config.chat_backend {
            ChatBackend::OpenAi => {
                let key = config.openai_api_key.clone().ok_or_else(|| {
                    ResearchError::Config("OPENAI_API_KEY not set".to_string())
                })?;
                Arc::new(OpenAiClient::new(key))
            }
            ChatBackend::Gemini => {
                let key = config.gemini_api_key.clone().ok_or_else(|| {
                    ResearchError::Config("GEMINI_API_KEY not set".to_string())
                })?;
                Arc::new(GeminiClient::new(key))
            }
        };

        Ok(Self::new(search, chat, config.budgets))
    }

    fn synthesis_budgets(&self) -> FallbackBudgets {
        FallbackBudgets {
            primary: self.budgets.synthesis,
            fallback: self.budgets.fallback,
        }
    }

    /// Full IPO report: 7-facet fan-out, synthesis, validation.
    pub async fn generate_ipo_report(&self, symbol: &str) -> Result<GeneratedReport> {
        let symbol = clean_subject(symbol, "symbol")?;
        let report_id = Uuid::new_v4();
        info!(%report_id, symbol = %symbol, "Generating IPO report");

        let bundle =
            run_research(self.search.as_ref(), IPO_FACETS, &symbol, self.budgets.research).await;
        require_content(&bundle, &symbol)?;

        let report = synthesis::synthesize_report(
            self.chat.as_ref(),
            &symbol,
            &bundle,
            self.synthesis_budgets(),
        )
        .await?;

        Ok(GeneratedReport {
            report,
            report_id,
            research_digest: bundle.digest,
        })
    }

    /// Stock or IPO recommendation with the secondary KPI fill pass.
    pub async fn generate_recommendation(
        &self,
        company: &str,
        asset_type: AssetType,
    ) -> Result<RecommendationBundle> {
        let company = clean_subject(company, "companyName")?;
        info!(company = %company, ?asset_type, "Generating recommendation");

        let facets = match asset_type {
            AssetType::Stock => STOCK_FACETS,
            AssetType::Ipo => IPO_FACETS,
        };
        let bundle =
            run_research(self.search.as_ref(), facets, &company, self.budgets.research).await;
        require_content(&bundle, &company)?;

        let (recommendation, mut analysis) = synthesis::synthesize_recommendation(
            self.chat.as_ref(),
            &company,
            asset_type,
            &bundle,
            self.synthesis_budgets(),
        )
        .await?;

        synthesis::fill_missing_kpis(
            self.chat.as_ref(),
            &company,
            &mut analysis.kpis,
            self.budgets.fallback,
        )
        .await;

        Ok(RecommendationBundle {
            recommendation,
            structured_analysis: analysis,
            research_summary: bundle.compiled_text(),
            analysis_timestamp: chrono::Utc::now(),
        })
    }

    /// Head-to-head comparison of 2..=4 companies.
    pub async fn compare_stocks(&self, companies: &[String]) -> Result<ComparisonOutcome> {
        let companies: Vec<String> = companies
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if !(2..=4).contains(&companies.len()) {
            return Err(ResearchError::InvalidRequest(
                "companies must list between 2 and 4 names".to_string(),
            ));
        }
        info!(companies = companies.len(), "Comparing stocks");

        let bundles: Vec<ResearchBundle> = join_all(companies.iter().map(|company| {
            run_research(
                self.search.as_ref(),
                COMPARISON_FACETS,
                company,
                self.budgets.research,
            )
        }))
        .await;

        if bundles.iter().all(|b| !b.has_content()) {
            return Err(ResearchError::EmptyResearch(companies.join(", ")));
        }

        let comparison = synthesis::synthesize_comparison(
            self.chat.as_ref(),
            &companies,
            &bundles,
            self.synthesis_budgets(),
        )
        .await?;

        // Merge sources across companies, exact-match dedup, first seen wins.
        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for bundle in &bundles {
            for url in &bundle.citations {
                if seen.insert(url.clone()) {
                    sources.push(url.clone());
                }
            }
        }

        Ok(ComparisonOutcome {
            comparison,
            sources,
        })
    }

    /// Follow-up question against an earlier recommendation. Search-grounded
    /// primary; plain chat fallback answers without citations.
    pub async fn recommendation_followup(
        &self,
        question: &str,
        context: Option<&str>,
    ) -> Result<FollowupAnswer> {
        let question = clean_subject(question, "question")?;
        info!("Answering recommendation follow-up");

        let system = "You answer follow-up questions about an equity research \
recommendation. Ground every claim in current sources and keep the answer \
to a few short paragraphs.";
        let query = match context {
            Some(context) if !context.trim().is_empty() => format!(
                "Earlier recommendation context:\n{}\n\nFollow-up question: {}",
                context.trim(),
                question
            ),
            _ => question.clone(),
        };

        let budgets = FallbackBudgets {
            primary: self.budgets.research,
            fallback: self.budgets.fallback,
        };
        let search = self.search.clone();
        let chat = self.chat.clone();
        let fallback_request = ChatRequest::new(system, query.clone());

        with_fallback(
            "recommendation_followup",
            budgets,
            || async move {
                let reply = search.research(&query, system, FOLLOWUP_RECENCY).await?;
                Ok(FollowupAnswer {
                    answer: reply.content,
                    citations: reply.citations,
                })
            },
            || async move {
                let answer = chat.complete(&fallback_request).await?;
                Ok(FollowupAnswer {
                    answer,
                    citations: Vec::new(),
                })
            },
        )
        .await
    }
}

fn clean_subject(raw: &str, field: &str) -> Result<String> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(ResearchError::InvalidRequest(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(cleaned.to_string())
}

fn require_content(bundle: &ResearchBundle, subject: &str) -> Result<()> {
    if !bundle.has_content() {
        return Err(ResearchError::EmptyResearch(subject.to_string()));
    }
    Ok(())
}

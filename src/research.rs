//! Facet fetchers and the fan-out coordinator
//!
//! All facets of a pipeline run are issued concurrently and joined; a
//! facet whose provider call fails or times out degrades to empty content
//! instead of aborting the run. The coordinator never retries a facet.

use crate::facets::FacetSpec;
use crate::providers::SearchProvider;
use crate::retry::with_timeout;
use futures::future::join_all;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Output of one facet fetch. Empty content marks a degraded facet.
#[derive(Debug, Clone, Serialize)]
pub struct FacetResult {
    pub key: &'static str,
    pub title: &'static str,
    pub content: String,
    pub citations: Vec<String>,
}

impl FacetResult {
    fn degraded(spec: &FacetSpec) -> Self {
        Self {
            key: spec.key,
            title: spec.title,
            content: String::new(),
            citations: Vec::new(),
        }
    }
}

/// All facet results for one run, with merged citations and a digest.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchBundle {
    pub results: Vec<FacetResult>,
    pub citations: Vec<String>,
    pub digest: String,
}

impl ResearchBundle {
    pub fn has_content(&self) -> bool {
        self.results.iter().any(|r| !r.content.trim().is_empty())
    }

    pub fn degraded_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.content.trim().is_empty())
            .count()
    }

    /// Labeled research text handed to the synthesis prompt.
    /// Degraded facets are skipped entirely.
    pub fn compiled_text(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            if result.content.trim().is_empty() {
                continue;
            }
            out.push_str("## ");
            out.push_str(result.title);
            out.push('\n');
            out.push_str(result.content.trim());
            out.push_str("\n\n");
        }
        out
    }
}

/// Fetch every facet concurrently and collect the bundle.
pub async fn run_research(
    search: &dyn SearchProvider,
    facets: &[FacetSpec],
    subject: &str,
    budget: Duration,
) -> ResearchBundle {
    let fetches = facets
        .iter()
        .map(|spec| fetch_facet(search, spec, subject, budget));
    let results = join_all(fetches).await;

    let degraded = results
        .iter()
        .filter(|r| r.content.trim().is_empty())
        .count();
    info!(
        subject,
        facets = results.len(),
        degraded,
        "Research fan-out complete"
    );

    let citations = merge_citations(&results);
    let digest = research_digest(&results);

    ResearchBundle {
        results,
        citations,
        digest,
    }
}

/// One search-grounded call. Failure and timeout both degrade to an
/// empty result so a single facet cannot abort the pipeline.
async fn fetch_facet(
    search: &dyn SearchProvider,
    spec: &FacetSpec,
    subject: &str,
    budget: Duration,
) -> FacetResult {
    let query = spec.render_query(subject);

    let outcome = with_timeout(budget, search.research(&query, spec.system, spec.recency), || {
        warn!(facet = spec.key, "Facet research call timed out");
    })
    .await;

    match outcome {
        Ok(reply) => FacetResult {
            key: spec.key,
            title: spec.title,
            content: reply.content,
            citations: reply.citations,
        },
        Err(error) => {
            warn!(facet = spec.key, %error, "Facet degraded to empty result");
            FacetResult::degraded(spec)
        }
    }
}

/// Merge citation lists, deduplicated by exact string match.
/// First occurrence wins and order of first occurrence is preserved.
pub fn merge_citations(results: &[FacetResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for result in results {
        for url in &result.citations {
            if seen.insert(url.clone()) {
                merged.push(url.clone());
            }
        }
    }
    merged
}

/// Deterministic digest of the research content, so callers can tell two
/// syntheses of identical research apart.
pub fn research_digest(results: &[FacetResult]) -> String {
    let mut hasher = Sha256::new();
    for result in results {
        hasher.update(result.key.as_bytes());
        hasher.update([0u8]);
        hasher.update(result.content.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::IPO_FACETS;
    use crate::providers::MockSearchProvider;

    fn facet(key: &'static str, citations: &[&str]) -> FacetResult {
        FacetResult {
            key,
            title: key,
            content: format!("content for {}", key),
            citations: citations.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_citation_dedup_preserves_first_seen_order() {
        let results = vec![facet("one", &["a", "b"]), facet("two", &["b", "c"])];
        assert_eq!(merge_citations(&results), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = vec![facet("one", &[])];
        let mut b = a.clone();
        b[0].content.push_str(" more");
        assert_ne!(research_digest(&a), research_digest(&b));
        assert_eq!(research_digest(&a), research_digest(&a.clone()));
    }

    #[tokio::test]
    async fn test_fan_out_survives_partial_facet_failure() {
        // Fail the sentiment and promoter facets; the other five carry on.
        let search = MockSearchProvider::new(
            "solid research text",
            vec!["https://example.com/src".to_string()],
        )
        .failing_on("sentiment")
        .failing_on("promoters");

        let bundle = run_research(&search, IPO_FACETS, "Acme Ltd", Duration::from_secs(5)).await;

        assert_eq!(bundle.results.len(), IPO_FACETS.len());
        assert_eq!(bundle.degraded_count(), 2);
        assert!(bundle.has_content());
        assert_eq!(bundle.citations, vec!["https://example.com/src"]);

        let text = bundle.compiled_text();
        assert!(text.contains("Business Overview"));
        assert!(!text.contains("Market Sentiment"));
    }

    #[tokio::test]
    async fn test_all_facets_failing_yields_empty_bundle() {
        let search = MockSearchProvider::new("unused", vec![]).failing_on("Acme");
        let bundle = run_research(&search, IPO_FACETS, "Acme Ltd", Duration::from_secs(5)).await;

        assert!(!bundle.has_content());
        assert_eq!(bundle.degraded_count(), IPO_FACETS.len());
        assert!(bundle.citations.is_empty());
    }
}

//! Research facet descriptors
//!
//! Each pipeline fans out over a table of facets instead of hand-written
//! per-facet functions. A facet is a query template, a system prompt, and
//! a recency filter sized to how fast that facet goes stale: sentiment
//! moves daily, deal structure weekly, business fundamentals monthly.

/// Search recency window for a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    Day,
    Week,
    Month,
}

impl Recency {
    pub fn as_filter(self) -> &'static str {
        match self {
            Recency::Day => "day",
            Recency::Week => "week",
            Recency::Month => "month",
        }
    }
}

/// One research question. `{subject}` in the query template is replaced
/// with the company name or IPO symbol at fetch time.
#[derive(Debug, Clone, Copy)]
pub struct FacetSpec {
    pub key: &'static str,
    pub title: &'static str,
    pub recency: Recency,
    pub query: &'static str,
    pub system: &'static str,
}

impl FacetSpec {
    pub fn render_query(&self, subject: &str) -> String {
        self.query.replace("{subject}", subject)
    }
}

const RESEARCH_SYSTEM: &str = "You are an equity research assistant. Answer \
only from current web sources, cite them, and state figures with their \
reporting period. If a figure cannot be found, say so instead of guessing.";

const SENTIMENT_SYSTEM: &str = "You are a market-desk analyst summarizing \
live sentiment. Report what sources say today, attribute every claim, and \
never extrapolate beyond the cited coverage.";

/// The seven facets of an IPO report.
pub const IPO_FACETS: &[FacetSpec] = &[
    FacetSpec {
        key: "business",
        title: "Business Overview",
        recency: Recency::Month,
        query: "What does {subject} do? Describe its business model, segments, market position, and competitive landscape for its upcoming or recent IPO.",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "financials",
        title: "Financial Performance",
        recency: Recency::Month,
        query: "Summarize {subject}'s revenue, profit, margins, and cash flow for the last three fiscal years, as disclosed in its IPO prospectus or filings.",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "risks",
        title: "Key Risks",
        recency: Recency::Month,
        query: "What are the principal risk factors for {subject}'s IPO: regulatory, customer concentration, litigation, leverage, and sector headwinds?",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "ipo_structure",
        title: "Issue Structure",
        recency: Recency::Week,
        query: "For the {subject} IPO: price band, lot size, issue size, fresh issue vs offer-for-sale split, key dates, and current grey market premium.",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "promoters",
        title: "Promoters & Shareholding",
        recency: Recency::Month,
        query: "Who are the promoters and anchor investors of {subject}? Describe pre- and post-issue shareholding and any promoter pledges or exits.",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "valuation",
        title: "Valuation vs Peers",
        recency: Recency::Week,
        query: "How is the {subject} IPO valued versus listed peers on P/E, P/B, and EV/EBITDA? Is the pricing considered aggressive or reasonable?",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "sentiment",
        title: "Market Sentiment",
        recency: Recency::Day,
        query: "What is today's market and analyst sentiment on the {subject} IPO, including subscription figures and brokerage views?",
        system: SENTIMENT_SYSTEM,
    },
];

/// The four facets of a listed-stock recommendation.
pub const STOCK_FACETS: &[FacetSpec] = &[
    FacetSpec {
        key: "fundamentals",
        title: "Fundamentals",
        recency: Recency::Month,
        query: "Summarize {subject}'s latest quarterly and annual results: revenue, profit growth, margins, ROE, debt, and management guidance.",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "technicals",
        title: "Price Action",
        recency: Recency::Week,
        query: "Describe {subject}'s recent stock price action: trend, 52-week range, key support and resistance levels, and notable volume moves.",
        system: RESEARCH_SYSTEM,
    },
    FacetSpec {
        key: "news",
        title: "News & Sentiment",
        recency: Recency::Day,
        query: "What is today's news flow and analyst sentiment on {subject}: upgrades, downgrades, target prices, and material announcements?",
        system: SENTIMENT_SYSTEM,
    },
    FacetSpec {
        key: "valuation",
        title: "Valuation",
        recency: Recency::Week,
        query: "How is {subject} valued versus its own history and sector peers on P/E, P/B, and dividend yield? Is consensus calling it cheap or expensive?",
        system: RESEARCH_SYSTEM,
    },
];

/// Consolidated per-company profile used by the comparison pipeline.
pub const COMPARISON_FACETS: &[FacetSpec] = &[FacetSpec {
    key: "profile",
    title: "Company Profile",
    recency: Recency::Week,
    query: "Give an investment profile of {subject}: business mix, latest financials, valuation multiples, growth outlook, and main risks.",
    system: RESEARCH_SYSTEM,
}];

/// Recency for follow-up questions about an existing recommendation.
pub const FOLLOWUP_RECENCY: Recency = Recency::Day;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_query_rendering() {
        let facet = &IPO_FACETS[0];
        let query = facet.render_query("Acme Ltd");
        assert!(query.contains("Acme Ltd"));
        assert!(!query.contains("{subject}"));
    }

    #[test]
    fn test_facet_keys_unique_per_table() {
        for table in [IPO_FACETS, STOCK_FACETS, COMPARISON_FACETS] {
            let keys: HashSet<_> = table.iter().map(|f| f.key).collect();
            assert_eq!(keys.len(), table.len());
        }
    }

    #[test]
    fn test_volatile_facets_use_day_recency() {
        let sentiment = IPO_FACETS.iter().find(|f| f.key == "sentiment").unwrap();
        assert_eq!(sentiment.recency, Recency::Day);
        let news = STOCK_FACETS.iter().find(|f| f.key == "news").unwrap();
        assert_eq!(news.recency, Recency::Day);
    }

    #[test]
    fn test_every_query_is_a_template() {
        for facet in IPO_FACETS.iter().chain(STOCK_FACETS).chain(COMPARISON_FACETS) {
            assert!(facet.query.contains("{subject}"), "{} lacks subject slot", facet.key);
        }
    }
}

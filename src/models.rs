//! Typed contracts for synthesized research output
//!
//! Model output is tolerant-parsed and deserialized into these types once
//! at the synthesis boundary; downstream code never handles raw JSON.
//! Out-of-enum verdicts and actions fail deserialization, which is the
//! schema rejection the routes surface as an error.

use crate::error::ResearchError;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// KPI cardinality the report contract promises.
pub const KPI_COUNT: usize = 8;

/// Canonical KPI labels for an IPO report, used to pad a short KPI list.
pub const IPO_KPI_LABELS: [&str; KPI_COUNT] = [
    "Issue Size",
    "Price Band",
    "Lot Size",
    "P/E (post-issue)",
    "ROE",
    "Debt/Equity",
    "Revenue Growth",
    "Grey Market Premium",
];

/// Canonical KPI labels for a listed-stock recommendation.
pub const STOCK_KPI_LABELS: [&str; KPI_COUNT] = [
    "Market Cap",
    "P/E",
    "EPS (TTM)",
    "ROE",
    "Dividend Yield",
    "Debt/Equity",
    "52W High",
    "52W Low",
];

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportVerdict {
    #[serde(rename = "SUBSCRIBE")]
    Subscribe,
    #[serde(rename = "AVOID")]
    Avoid,
    #[serde(rename = "HIGH-RISK SUBSCRIBE")]
    HighRiskSubscribe,
    #[serde(rename = "LONG-TERM SUBSCRIBE")]
    LongTermSubscribe,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValuationView {
    Attractive,
    Fair,
    Stretched,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Ipo,
}

impl Default for AssetType {
    fn default() -> Self {
        AssetType::Stock
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationAction {
    Buy,
    Sell,
    Hold,
    Apply,
    Avoid,
    Neutral,
}

impl RecommendationAction {
    /// BUY/SELL/HOLD apply to listed stocks, APPLY/AVOID/NEUTRAL to IPOs.
    pub fn admissible_for(self, asset_type: AssetType) -> bool {
        use RecommendationAction::*;
        match asset_type {
            AssetType::Stock => matches!(self, Buy | Sell | Hold),
            AssetType::Ipo => matches!(self, Apply | Avoid | Neutral),
        }
    }
}

//
// ================= Report =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub key: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Kpi {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredReport {
    pub verdict: ReportVerdict,
    pub valuation_view: ValuationView,
    pub symbol: String,
    pub sections: Vec<ReportSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpis: Option<Vec<Kpi>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl StructuredReport {
    /// Pad a short KPI list with "N/A" entries under the canonical labels
    /// and truncate past [`KPI_COUNT`]. An absent KPI array stays absent.
    pub fn normalize_kpis(&mut self, labels: &[&str; KPI_COUNT]) {
        let Some(kpis) = self.kpis.as_mut() else {
            return;
        };

        kpis.truncate(KPI_COUNT);
        for label in labels.iter().skip(kpis.len()) {
            kpis.push(Kpi {
                label: (*label).to_string(),
                value: "N/A".to_string(),
            });
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(ResearchError::SchemaValidation(
                "Report has no sections".to_string(),
            ));
        }
        if let Some(kpis) = &self.kpis {
            if kpis.len() != KPI_COUNT {
                return Err(ResearchError::SchemaValidation(format!(
                    "Expected {} KPIs, got {}",
                    KPI_COUNT,
                    kpis.len()
                )));
            }
        }
        Ok(())
    }
}

/// A validated report plus the request-scoped audit fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    #[serde(flatten)]
    pub report: StructuredReport,
    pub report_id: Uuid,
    pub research_digest: String,
}

//
// ================= Recommendation =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: RecommendationAction,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    pub reasoning: String,
    pub key_factors: Vec<String>,
    pub risks: Vec<String>,
    pub time_horizon: String,
}

impl Recommendation {
    pub fn validate(&self, asset_type: AssetType) -> Result<()> {
        if !(1..=100).contains(&self.confidence) {
            return Err(ResearchError::SchemaValidation(format!(
                "Confidence {} outside 1..=100",
                self.confidence
            )));
        }
        if !self.action.admissible_for(asset_type) {
            return Err(ResearchError::SchemaValidation(format!(
                "Action {:?} not admissible for {:?}",
                self.action, asset_type
            )));
        }
        Ok(())
    }
}

/// Sectioned analysis accompanying a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    pub sections: Vec<ReportSection>,
    pub kpis: Vec<Kpi>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationBundle {
    pub recommendation: Recommendation,
    pub structured_analysis: StructuredAnalysis,
    pub research_summary: String,
    pub analysis_timestamp: DateTime<Utc>,
}

//
// ================= Comparison =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub metrics: Vec<Kpi>,
    pub outlook: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonVerdict {
    pub preferred: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockComparison {
    pub companies: Vec<CompanyProfile>,
    pub comparison: ComparisonVerdict,
}

impl StockComparison {
    pub fn validate(&self, expected_companies: usize) -> Result<()> {
        if self.companies.is_empty() {
            return Err(ResearchError::SchemaValidation(
                "Comparison covers no companies".to_string(),
            ));
        }
        if self.companies.len() != expected_companies {
            return Err(ResearchError::SchemaValidation(format!(
                "Comparison covers {} companies, expected {}",
                self.companies.len(),
                expected_companies
            )));
        }
        Ok(())
    }
}

/// Comparison plus merged, deduplicated sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub comparison: StockComparison,
    pub sources: Vec<String>,
}

//
// ================= Followup =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupAnswer {
    pub answer: String,
    pub citations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_report(kpis: Option<Vec<Kpi>>) -> StructuredReport {
        StructuredReport {
            verdict: ReportVerdict::Subscribe,
            valuation_view: ValuationView::Fair,
            symbol: "LICI".to_string(),
            sections: vec![ReportSection {
                key: "business".to_string(),
                title: "Business Overview".to_string(),
                content: "Life insurer.".to_string(),
            }],
            kpis,
            sources: None,
        }
    }

    #[test]
    fn test_verdict_enum_rejects_unknown_value() {
        let raw = json!({
            "verdict": "MAYBE",
            "valuation_view": "FAIR",
            "symbol": "LICI",
            "sections": [{"key": "a", "title": "A", "content": "x"}]
        });
        assert!(serde_json::from_value::<StructuredReport>(raw).is_err());
    }

    #[test]
    fn test_hyphenated_verdicts_round_trip() {
        for (verdict, wire) in [
            (ReportVerdict::HighRiskSubscribe, "\"HIGH-RISK SUBSCRIBE\""),
            (ReportVerdict::LongTermSubscribe, "\"LONG-TERM SUBSCRIBE\""),
        ] {
            assert_eq!(serde_json::to_string(&verdict).unwrap(), wire);
        }
    }

    #[test]
    fn test_kpis_padded_to_contract_length() {
        let mut report = minimal_report(Some(vec![Kpi {
            label: "Issue Size".to_string(),
            value: "₹21,000 Cr".to_string(),
        }]));
        report.normalize_kpis(&IPO_KPI_LABELS);

        let kpis = report.kpis.as_ref().unwrap();
        assert_eq!(kpis.len(), KPI_COUNT);
        assert_eq!(kpis[0].value, "₹21,000 Cr");
        assert_eq!(kpis[7].label, "Grey Market Premium");
        assert_eq!(kpis[7].value, "N/A");
        assert!(report.validate().is_ok());
    }

    #[test]
    fn test_absent_kpis_stay_absent() {
        let mut report = minimal_report(None);
        report.normalize_kpis(&IPO_KPI_LABELS);
        assert!(report.kpis.is_none());
        assert!(report.validate().is_ok());
    }

    #[test]
    fn test_empty_sections_fail_validation() {
        let mut report = minimal_report(None);
        report.sections.clear();
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_action_admissibility_per_asset_type() {
        assert!(RecommendationAction::Buy.admissible_for(AssetType::Stock));
        assert!(!RecommendationAction::Apply.admissible_for(AssetType::Stock));
        assert!(RecommendationAction::Apply.admissible_for(AssetType::Ipo));
        assert!(!RecommendationAction::Hold.admissible_for(AssetType::Ipo));
    }

    #[test]
    fn test_confidence_bounds() {
        let recommendation = Recommendation {
            action: RecommendationAction::Buy,
            confidence: 0,
            target_price: None,
            current_price: None,
            reasoning: "x".to_string(),
            key_factors: vec![],
            risks: vec![],
            time_horizon: "6-12 months".to_string(),
        };
        assert!(recommendation.validate(AssetType::Stock).is_err());

        let recommendation = Recommendation {
            confidence: 72,
            ..recommendation
        };
        assert!(recommendation.validate(AssetType::Stock).is_ok());
    }
}

//! Synthesis stage: research bundle in, validated JSON contract out
//!
//! Each synthesis call instructs the model to use only the supplied
//! research notes and to emit an exact JSON shape. The reply is
//! tolerant-extracted, deserialized into the typed contract (out-of-enum
//! verdicts fail here), then validated. Every call site runs under the
//! tools-then-no-tools fallback policy.

use crate::error::ResearchError;
use crate::extract::extract_json;
use crate::models::{
    AssetType, Kpi, Recommendation, StockComparison, StructuredAnalysis, StructuredReport,
    IPO_KPI_LABELS, KPI_COUNT, STOCK_KPI_LABELS,
};
use crate::providers::{ChatProvider, ChatRequest};
use crate::research::ResearchBundle;
use crate::retry::{with_fallback, with_timeout, FallbackBudgets};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

/// Run a synthesis request through the fallback policy and decode the
/// reply into `T`. Decode failure after a successful call is a schema
/// rejection, not a provider error.
async fn complete_structured<T>(
    chat: &dyn ChatProvider,
    label: &str,
    request: ChatRequest,
    budgets: FallbackBudgets,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let primary = request.clone().with_web_search(true);
    let fallback = request.without_tools();

    let raw = with_fallback(
        label,
        budgets,
        || chat.complete(&primary),
        || chat.complete(&fallback),
    )
    .await?;

    let value = extract_json(&raw).ok_or(ResearchError::Unparseable)?;
    serde_json::from_value(value).map_err(|e| ResearchError::SchemaValidation(e.to_string()))
}

//
// ================= IPO report =================
//

const REPORT_SYSTEM: &str = r#"You are a senior IPO research analyst.

Write strictly from the research notes supplied by the user. Do not add
figures, names, or events from your own knowledge; a KPI that is absent
from the notes must be reported as "N/A".

Respond with ONLY valid JSON in exactly this shape:

{
  "verdict": "SUBSCRIBE" | "AVOID" | "HIGH-RISK SUBSCRIBE" | "LONG-TERM SUBSCRIBE",
  "valuation_view": "ATTRACTIVE" | "FAIR" | "STRETCHED",
  "symbol": "<echo the symbol you were given>",
  "sections": [
    { "key": "business", "title": "Business Overview", "content": "..." },
    { "key": "financials", "title": "Financial Performance", "content": "..." },
    { "key": "risks", "title": "Key Risks", "content": "..." },
    { "key": "verdict", "title": "Verdict Rationale", "content": "..." }
  ],
  "kpis": [ { "label": "...", "value": "..." } ]
}

No prose before or after the JSON. No markdown fences."#;

pub async fn synthesize_report(
    chat: &dyn ChatProvider,
    symbol: &str,
    bundle: &ResearchBundle,
    budgets: FallbackBudgets,
) -> Result<StructuredReport> {
    let user = format!(
        "IPO symbol: {}\n\nResearch notes:\n\n{}",
        symbol,
        bundle.compiled_text()
    );

    let mut report: StructuredReport = complete_structured(
        chat,
        "ipo_report_synthesis",
        ChatRequest::new(REPORT_SYSTEM, user),
        budgets,
    )
    .await?;

    if report.sources.as_ref().map_or(true, |s| s.is_empty()) {
        report.sources = Some(bundle.citations.clone());
    }
    report.normalize_kpis(&IPO_KPI_LABELS);
    report.validate()?;

    info!(symbol, verdict = ?report.verdict, "IPO report synthesized");
    Ok(report)
}

//
// ================= Recommendation =================
//

#[derive(Debug, Deserialize)]
struct RecommendationPayload {
    recommendation: Recommendation,
    analysis: StructuredAnalysis,
}

fn recommendation_system(asset_type: AssetType) -> String {
    let actions = match asset_type {
        AssetType::Stock => r#""BUY" | "SELL" | "HOLD""#,
        AssetType::Ipo => r#""APPLY" | "AVOID" | "NEUTRAL""#,
    };

    format!(
        r#"You are a senior equity research analyst.

Write strictly from the research notes supplied by the user. Do not add
figures or events from your own knowledge; report unknown KPI values as
"N/A".

Respond with ONLY valid JSON in exactly this shape:

{{
  "recommendation": {{
    "action": {actions},
    "confidence": <integer 1-100>,
    "targetPrice": <number or omit>,
    "currentPrice": <number or omit>,
    "reasoning": "...",
    "keyFactors": ["..."],
    "risks": ["..."],
    "timeHorizon": "..."
  }},
  "analysis": {{
    "sections": [ {{ "key": "...", "title": "...", "content": "..." }} ],
    "kpis": [ {{ "label": "...", "value": "..." }} ]
  }}
}}

No prose before or after the JSON. No markdown fences."#
    )
}

pub async fn synthesize_recommendation(
    chat: &dyn ChatProvider,
    company: &str,
    asset_type: AssetType,
    bundle: &ResearchBundle,
    budgets: FallbackBudgets,
) -> Result<(Recommendation, StructuredAnalysis)> {
    let user = format!(
        "Company: {}\n\nResearch notes:\n\n{}",
        company,
        bundle.compiled_text()
    );

    let payload: RecommendationPayload = complete_structured(
        chat,
        "recommendation_synthesis",
        ChatRequest::new(recommendation_system(asset_type), user),
        budgets,
    )
    .await?;

    let RecommendationPayload {
        recommendation,
        mut analysis,
    } = payload;

    recommendation.validate(asset_type)?;
    if analysis.sections.is_empty() {
        return Err(ResearchError::SchemaValidation(
            "Analysis has no sections".to_string(),
        ));
    }

    normalize_analysis_kpis(&mut analysis, asset_type);

    info!(company, action = ?recommendation.action, confidence = recommendation.confidence,
        "Recommendation synthesized");
    Ok((recommendation, analysis))
}

fn normalize_analysis_kpis(analysis: &mut StructuredAnalysis, asset_type: AssetType) {
    let labels = match asset_type {
        AssetType::Stock => &STOCK_KPI_LABELS,
        AssetType::Ipo => &IPO_KPI_LABELS,
    };
    analysis.kpis.truncate(KPI_COUNT);
    for label in labels.iter().skip(analysis.kpis.len()) {
        analysis.kpis.push(Kpi {
            label: (*label).to_string(),
            value: "N/A".to_string(),
        });
    }
}

/// Secondary pass for KPIs the synthesis left at "N/A": one no-tools call
/// asking for just those values, merged where the model supplied one.
/// Failure here is non-fatal; the KPIs simply stay "N/A".
pub async fn fill_missing_kpis(
    chat: &dyn ChatProvider,
    company: &str,
    kpis: &mut [Kpi],
    budget: std::time::Duration,
) {
    let missing: Vec<&str> = kpis
        .iter()
        .filter(|k| k.value == "N/A")
        .map(|k| k.label.as_str())
        .collect();
    if missing.is_empty() {
        return;
    }

    let system = "You fill in financial KPI values. Respond with ONLY a JSON \
object mapping each requested label to its value as a string. Use \"N/A\" \
for anything you cannot state.";
    let user = format!("Company: {}\nProvide values for: {}", company, missing.join(", "));
    let request = ChatRequest::new(system, user);

    let outcome = with_timeout(budget, chat.complete(&request), || {
        warn!(company, "KPI fill pass timed out");
    })
    .await;

    let raw = match outcome {
        Ok(raw) => raw,
        Err(error) => {
            warn!(company, %error, "KPI fill pass failed, keeping N/A values");
            return;
        }
    };

    let Some(value) = extract_json(&raw) else {
        warn!(company, "KPI fill pass returned no JSON, keeping N/A values");
        return;
    };
    let Some(map) = value.as_object() else {
        return;
    };

    let mut filled = 0;
    for kpi in kpis.iter_mut().filter(|k| k.value == "N/A") {
        if let Some(new_value) = map.get(&kpi.label).and_then(|v| v.as_str()) {
            if !new_value.trim().is_empty() && new_value != "N/A" {
                kpi.value = new_value.to_string();
                filled += 1;
            }
        }
    }
    info!(company, filled, "KPI fill pass complete");
}

//
// ================= Comparison =================
//

const COMPARISON_SYSTEM: &str = r#"You are a senior equity research analyst
comparing companies head to head.

Write strictly from the research notes supplied by the user. Cover every
company the user names, in the same order.

Respond with ONLY valid JSON in exactly this shape:

{
  "companies": [
    {
      "name": "...",
      "strengths": ["..."],
      "weaknesses": ["..."],
      "metrics": [ { "label": "...", "value": "..." } ],
      "outlook": "..."
    }
  ],
  "comparison": { "preferred": "<name of the strongest pick>", "rationale": "..." }
}

No prose before or after the JSON. No markdown fences."#;

pub async fn synthesize_comparison(
    chat: &dyn ChatProvider,
    companies: &[String],
    bundles: &[ResearchBundle],
    budgets: FallbackBudgets,
) -> Result<StockComparison> {
    let mut user = format!("Companies to compare: {}\n\n", companies.join(", "));
    for (company, bundle) in companies.iter().zip(bundles) {
        user.push_str(&format!("# {}\n\n{}\n", company, bundle.compiled_text()));
    }

    let comparison: StockComparison = complete_structured(
        chat,
        "comparison_synthesis",
        ChatRequest::new(COMPARISON_SYSTEM, user),
        budgets,
    )
    .await?;

    comparison.validate(companies.len())?;
    info!(companies = companies.len(), "Comparison synthesized");
    Ok(comparison)
}

//! REST API server for the research pipeline
//!
//! Exposes the four research routes plus a health check. Handlers parse
//! the request, run the pipeline, and map errors to HTTP statuses; all
//! domain logic lives in the pipeline.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::ResearchError;
use crate::models::AssetType;
use crate::pipeline::ResearchPipeline;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct IpoReportRequest {
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub company_name: String,
    #[serde(default)]
    pub asset_type: AssetType,
}

#[derive(Debug, Deserialize)]
pub struct CompareStocksRequest {
    pub companies: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FollowupRequest {
    pub question: String,
    pub context: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<ResearchPipeline>,
}

/// Map a pipeline error to the status the route surfaces.
/// Upstream/synthesis failures are bad-gateway: the request was fine,
/// the research layer was not.
fn error_status(error: &ResearchError) -> StatusCode {
    match error {
        ResearchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ResearchError::Provider(_)
        | ResearchError::Timeout(_)
        | ResearchError::Unparseable
        | ResearchError::SchemaValidation(_)
        | ResearchError::EmptyResearch(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(error: ResearchError) -> (StatusCode, Json<ApiResponse>) {
    (
        error_status(&error),
        Json(ApiResponse::error(error.to_string())),
    )
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Research Endpoints
/// =============================

async fn generate_ipo_report(
    State(state): State<ApiState>,
    Json(req): Json<IpoReportRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(symbol = %req.symbol, "Received IPO report request");

    match state.pipeline.generate_ipo_report(&req.symbol).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report))),
        Err(error) => failure(error),
    }
}

async fn generate_recommendation(
    State(state): State<ApiState>,
    Json(req): Json<RecommendationRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(company = %req.company_name, asset_type = ?req.asset_type,
        "Received recommendation request");

    match state
        .pipeline
        .generate_recommendation(&req.company_name, req.asset_type)
        .await
    {
        Ok(bundle) => (StatusCode::OK, Json(ApiResponse::success(bundle))),
        Err(error) => failure(error),
    }
}

async fn compare_stocks(
    State(state): State<ApiState>,
    Json(req): Json<CompareStocksRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(companies = req.companies.len(), "Received comparison request");

    match state.pipeline.compare_stocks(&req.companies).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))),
        Err(error) => failure(error),
    }
}

async fn recommendation_followup(
    State(state): State<ApiState>,
    Json(req): Json<FollowupRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("Received follow-up request");

    match state
        .pipeline
        .recommendation_followup(&req.question, req.context.as_deref())
        .await
    {
        Ok(answer) => (StatusCode::OK, Json(ApiResponse::success(answer))),
        Err(error) => failure(error),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<ResearchPipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/generate-ipo-report", post(generate_ipo_report))
        .route("/api/generate-recommendation", post(generate_recommendation))
        .route("/api/compare-stocks", post(compare_stocks))
        .route("/api/recommendation-followup", post(recommendation_followup))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    pipeline: Arc<ResearchPipeline>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

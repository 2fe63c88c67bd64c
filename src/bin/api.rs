use askalpha_research::{api::start_server, Config, ResearchPipeline};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::from_env().map_err(|e| {
        eprintln!("⚠️  {}", e);
        eprintln!("📌 See .env.example for setup instructions");
        e
    })?;

    info!("🚀 AskAlpha Research Pipeline - API Server");
    info!("📍 Port: {}", config.port);

    let pipeline = Arc::new(ResearchPipeline::from_config(&config)?);

    info!("✅ Pipeline initialized");
    info!("📡 Starting API server...");

    start_server(pipeline, config.port).await?;

    Ok(())
}

use askalpha_research::{AssetType, Config, ResearchPipeline};
use tracing::info;

const USAGE: &str = "Usage:
  report ipo <symbol>
  report stock <company>
  report ipo-reco <company>
  report compare <company> <company> [company...]
  report followup <question> [context]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = Config::from_env()?;
    let pipeline = ResearchPipeline::from_config(&config)?;

    info!(command = %command, "Running research pipeline");

    let output = match (command.as_str(), rest) {
        ("ipo", [symbol]) => {
            serde_json::to_value(pipeline.generate_ipo_report(symbol).await?)?
        }
        ("stock", [company]) => serde_json::to_value(
            pipeline
                .generate_recommendation(company, AssetType::Stock)
                .await?,
        )?,
        ("ipo-reco", [company]) => serde_json::to_value(
            pipeline
                .generate_recommendation(company, AssetType::Ipo)
                .await?,
        )?,
        ("compare", companies) if companies.len() >= 2 => {
            serde_json::to_value(pipeline.compare_stocks(companies).await?)?
        }
        ("followup", [question]) => {
            serde_json::to_value(pipeline.recommendation_followup(question, None).await?)?
        }
        ("followup", [question, context]) => serde_json::to_value(
            pipeline
                .recommendation_followup(question, Some(context))
                .await?,
        )?,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

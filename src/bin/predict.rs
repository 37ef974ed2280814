//! One-shot prediction: forecast a symbol, store its best buy and sell
//! points on the ledger and print the result as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use forecast_ledger::config::AppConfig;
use forecast_ledger::core::pipeline::{build_engine, build_writer, PredictionPipeline};
use forecast_ledger::logging;
use forecast_ledger::models::candle::Candle;
use forecast_ledger::services::market_data::{
    FileMarketDataProvider, InMemoryMarketDataProvider, MarketDataProvider,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "predict",
    version,
    about = "Forecast a price trajectory and record its best buy/sell points on the ledger"
)]
struct Cli {
    /// Symbol to forecast (e.g. AAPL)
    symbol: String,

    /// JSON candle history to use instead of MARKET_DATA_DIR/<SYMBOL>.json
    #[arg(long)]
    history: Option<PathBuf>,

    /// Seed the noise source for a reproducible trajectory
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the ledger write stage
    #[arg(long)]
    no_ledger: bool,
}

fn load_history(path: &PathBuf) -> Result<Vec<Candle>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(seed) = cli.seed {
        config.forecast = config.forecast.with_seed(seed);
    }

    let market_data: Arc<dyn MarketDataProvider> = match cli.history {
        Some(ref path) => Arc::new(
            InMemoryMarketDataProvider::new().with_candles(&cli.symbol, load_history(path)?),
        ),
        None => Arc::new(FileMarketDataProvider::new(&config.market_data_dir)),
    };

    let mut pipeline = PredictionPipeline::new(market_data, build_engine(&config)?);
    if !cli.no_ledger {
        pipeline = pipeline.with_writer(Arc::new(build_writer(&config.ledger, None)));
    }

    info!(symbol = %cli.symbol, seeded = config.forecast.seed.is_some(), "running prediction");
    let result = pipeline.run(&cli.symbol).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

//! End-to-end run: history → window → rollout → extrema → ledger.
//!
//! Stages are strictly sequential. Data and model failures abort the run;
//! ledger problems are reported inside the result and never discard the
//! forecast.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{AppConfig, LedgerConfig};
use crate::error::ForecastError;
use crate::forecast::engine::{ForecastContext, ForecastEngine};
use crate::ledger::client::{JsonRpcLedgerClient, LedgerClient};
use crate::ledger::writer::{LedgerOutcome, LedgerWriter, WriterPolicy};
use crate::metrics::Metrics;
use crate::models::forecast::{ExtremumPoint, PriceWindow, Trajectory};
use crate::models::prediction::PredictionResult;
use crate::services::market_data::{validate_symbol, FileMarketDataProvider, MarketDataProvider};
use crate::signals::extrema::select_extrema;

pub struct PredictionPipeline {
    market_data: Arc<dyn MarketDataProvider>,
    engine: ForecastEngine,
    writer: Option<Arc<LedgerWriter>>,
    metrics: Option<Arc<Metrics>>,
}

impl PredictionPipeline {
    pub fn new(market_data: Arc<dyn MarketDataProvider>, engine: ForecastEngine) -> Self {
        Self {
            market_data,
            engine,
            writer: None,
            metrics: None,
        }
    }

    pub fn with_writer(mut self, writer: Arc<LedgerWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    pub fn writer(&self) -> Option<&Arc<LedgerWriter>> {
        self.writer.as_ref()
    }

    /// Forecast `symbol` and record its best buy and sell points.
    pub async fn run(&self, symbol: &str) -> Result<PredictionResult, ForecastError> {
        let symbol = symbol.trim().to_uppercase();
        let started = Instant::now();
        if let Some(ref metrics) = self.metrics {
            metrics.forecast_runs_total.inc();
        }

        let result = self.run_stages(&symbol).await;

        if let Some(ref metrics) = self.metrics {
            metrics
                .forecast_duration_seconds
                .observe(started.elapsed().as_secs_f64());
            if result.is_err() {
                metrics.forecast_failures_total.inc();
            }
        }
        if let Err(ref e) = result {
            warn!(symbol = %symbol, error = %e, "prediction run aborted");
        }
        result
    }

    async fn run_stages(&self, symbol: &str) -> Result<PredictionResult, ForecastError> {
        validate_symbol(symbol)?;
        let (trajectory, buy, sell) = self.forecast(symbol).await?;

        let ledger_records = match self.writer {
            Some(ref writer) => writer.record(symbol, &[buy, sell]).await,
            None => LedgerOutcome::Skipped {
                reason: "ledger writer not configured".to_string(),
            },
        };

        Ok(PredictionResult {
            symbol: symbol.to_string(),
            trajectory,
            buy,
            sell,
            ledger_records,
        })
    }

    /// Forecast half of the run: trajectory plus `(buy, sell)`.
    pub async fn forecast(
        &self,
        symbol: &str,
    ) -> Result<(Trajectory, ExtremumPoint, ExtremumPoint), ForecastError> {
        let seq_len = self.engine.config().seq_len;
        let candles = self
            .market_data
            .get_candles(symbol, seq_len + 1)
            .await
            .map_err(|e| ForecastError::MarketData(e.to_string()))?;

        let start = candles
            .last()
            .map(|c| c.timestamp)
            .ok_or(ForecastError::InsufficientData {
                required: seq_len,
                available: 0,
            })?;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let window =
            PriceWindow::from_history(&closes, self.engine.context().normalizer.as_ref(), seq_len)?;

        let engine = self.engine.clone();
        let trajectory = tokio::task::spawn_blocking(move || engine.forecast(window, start))
            .await
            .map_err(|e| ForecastError::Model(format!("forecast task failed: {}", e)))??;

        let (buy, sell) = select_extrema(&trajectory)?;
        info!(
            symbol = %symbol,
            buy_price = buy.price,
            buy_at = %buy.timestamp,
            sell_price = sell.price,
            sell_at = %sell.timestamp,
            "forecast selected trade points"
        );
        Ok((trajectory, buy, sell))
    }
}

/// Forecast engine over the configured JSON artifacts.
pub fn build_engine(config: &AppConfig) -> Result<ForecastEngine, ForecastError> {
    let context = ForecastContext::load(&config.model_path, &config.scaler_path)?;
    ForecastEngine::new(config.forecast.clone(), context)
}

/// JSON-RPC backed writer. A missing descriptor or account does not fail
/// here; the writer skips its stage at run time instead.
pub fn build_writer(config: &LedgerConfig, metrics: Option<Arc<Metrics>>) -> LedgerWriter {
    let client: Arc<dyn LedgerClient> = Arc::new(JsonRpcLedgerClient::new(config));
    let writer = LedgerWriter::new(client, WriterPolicy::from(config));
    match metrics {
        Some(metrics) => writer.with_metrics(metrics),
        None => writer,
    }
}

/// Wire the pipeline from configuration: JSON artifacts, file-backed
/// market data and a JSON-RPC ledger writer.
pub fn build_pipeline(
    config: &AppConfig,
    metrics: Option<Arc<Metrics>>,
) -> Result<PredictionPipeline, ForecastError> {
    let engine = build_engine(config)?;
    let market_data: Arc<dyn MarketDataProvider> =
        Arc::new(FileMarketDataProvider::new(&config.market_data_dir));
    let writer = Arc::new(build_writer(&config.ledger, metrics.clone()));

    let pipeline = PredictionPipeline::new(market_data, engine).with_writer(writer);
    Ok(match metrics {
        Some(metrics) => pipeline.with_metrics(metrics),
        None => pipeline,
    })
}

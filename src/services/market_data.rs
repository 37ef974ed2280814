//! Market data provider interface.
//!
//! Fetching from a live exchange or quote API is left to implementors of
//! [`MarketDataProvider`]; the providers here serve stored history.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use crate::error::ForecastError;
use crate::models::candle::Candle;

/// Accept ticker-like symbols only: ASCII alphanumerics and `-_.^=`, no `..`.
pub fn validate_symbol(symbol: &str) -> Result<(), ForecastError> {
    let valid = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '^' | '='))
        && !symbol.contains("..");
    if valid {
        Ok(())
    } else {
        Err(ForecastError::InvalidSymbol(symbol.to_string()))
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Up to `limit` most recent candles for a symbol, oldest first.
    async fn get_candles(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, Box<dyn std::error::Error + Send + Sync>>;
}

fn latest(mut candles: Vec<Candle>, limit: usize) -> Vec<Candle> {
    candles.sort_by_key(|c| c.timestamp);
    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
    candles
}

/// Candles held in memory, keyed by upper-cased symbol.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketDataProvider {
    candles: HashMap<String, Vec<Candle>>,
}

impl InMemoryMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.candles.insert(symbol.to_uppercase(), candles);
        self
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketDataProvider {
    async fn get_candles(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, Box<dyn std::error::Error + Send + Sync>> {
        let candles = self
            .candles
            .get(&symbol.to_uppercase())
            .cloned()
            .unwrap_or_default();
        Ok(latest(candles, limit))
    }
}

/// Reads `<dir>/<SYMBOL>.json`, a JSON array of candles.
#[derive(Debug, Clone)]
pub struct FileMarketDataProvider {
    dir: PathBuf,
}

impl FileMarketDataProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        validate_symbol(symbol)?;
        Ok(self.dir.join(format!("{}.json", symbol.to_uppercase())))
    }
}

#[async_trait]
impl MarketDataProvider for FileMarketDataProvider {
    async fn get_candles(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, Box<dyn std::error::Error + Send + Sync>> {
        let path = self.path_for(symbol)?;
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let candles: Vec<Candle> = serde_json::from_str(&raw)
            .map_err(|e| format!("invalid candle file {}: {}", path.display(), e))?;

        debug!(symbol = %symbol, count = candles.len(), "loaded candle history");
        Ok(latest(candles, limit))
    }
}

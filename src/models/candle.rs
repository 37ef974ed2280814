use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bar of market history as supplied by a market data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }

    /// Candle carrying only a close price, as produced by close-only feeds.
    pub fn from_close(close: f64, timestamp: DateTime<Utc>) -> Self {
        Self::new(close, close, close, close, 0.0, timestamp)
    }
}

//! Errors that abort a forecasting run.

use thiserror::Error;

/// Data and model failures. Any of these aborts the whole run; no partial
/// trajectory is ever returned alongside one.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient data: need {required} valid points, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("extremum selection on an empty or degenerate trajectory")]
    EmptyTrajectory,

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("normalizer error: {0}")]
    Normalizer(String),

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("market data error: {0}")]
    MarketData(String),

    #[error("artifact error: {0}")]
    Artifact(String),
}

impl From<serde_json::Error> for ForecastError {
    fn from(e: serde_json::Error) -> Self {
        Self::Artifact(e.to_string())
    }
}

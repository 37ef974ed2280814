//! Reversible mapping between raw prices and the model's numeric range.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ForecastError;

/// Fit-once transform shared read-only across ensemble calls.
pub trait Normalizer: Send + Sync {
    fn transform(&self, raw: &[f64]) -> Result<Vec<f64>, ForecastError>;

    fn inverse_transform(&self, normalized: &[f64]) -> Result<Vec<f64>, ForecastError>;
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// Min-max scaler loaded from a JSON artifact.
///
/// ```json
/// { "data_min": 101.3, "data_max": 187.9, "feature_range": [0.0, 1.0] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: f64,
    pub data_max: f64,
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
}

impl MinMaxScaler {
    pub fn new(data_min: f64, data_max: f64) -> Result<Self, ForecastError> {
        Self::with_range(data_min, data_max, default_feature_range())
    }

    pub fn with_range(
        data_min: f64,
        data_max: f64,
        feature_range: (f64, f64),
    ) -> Result<Self, ForecastError> {
        let scaler = Self {
            data_min,
            data_max,
            feature_range,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::Artifact(format!("cannot read scaler {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ForecastError> {
        let scaler: Self = serde_json::from_str(raw)?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<(), ForecastError> {
        let (lo, hi) = self.feature_range;
        if ![self.data_min, self.data_max, lo, hi].iter().all(|v| v.is_finite()) {
            return Err(ForecastError::Normalizer(
                "scaler parameters must be finite".to_string(),
            ));
        }
        if self.data_max < self.data_min {
            return Err(ForecastError::Normalizer(format!(
                "data_max {} below data_min {}",
                self.data_max, self.data_min
            )));
        }
        if hi <= lo {
            return Err(ForecastError::Normalizer(format!(
                "empty feature range ({}, {})",
                lo, hi
            )));
        }
        Ok(())
    }

    /// Multiplier from raw to normalized units. A constant training series
    /// counts as a data range of one.
    fn scale(&self) -> f64 {
        let (lo, hi) = self.feature_range;
        let data_range = self.data_max - self.data_min;
        if data_range == 0.0 {
            hi - lo
        } else {
            (hi - lo) / data_range
        }
    }
}

impl Normalizer for MinMaxScaler {
    fn transform(&self, raw: &[f64]) -> Result<Vec<f64>, ForecastError> {
        let scale = self.scale();
        let lo = self.feature_range.0;
        Ok(raw
            .iter()
            .map(|x| lo + (x - self.data_min) * scale)
            .collect())
    }

    fn inverse_transform(&self, normalized: &[f64]) -> Result<Vec<f64>, ForecastError> {
        let scale = self.scale();
        let lo = self.feature_range.0;
        Ok(normalized
            .iter()
            .map(|y| self.data_min + (y - lo) / scale)
            .collect())
    }
}

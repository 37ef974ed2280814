//! Forecast data model: context window, trajectory and selected points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::forecast::normalizer::Normalizer;

/// Normalized context fed to the generative model.
///
/// Always holds exactly the length it was built with. Advancing produces a
/// new window instead of mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceWindow {
    values: Vec<f64>,
}

impl PriceWindow {
    pub fn new(values: Vec<f64>, seq_len: usize) -> Result<Self, ForecastError> {
        if seq_len == 0 {
            return Err(ForecastError::InvalidWindow(
                "window length must be positive".to_string(),
            ));
        }
        if values.len() != seq_len {
            return Err(ForecastError::InsufficientData {
                required: seq_len,
                available: values.len(),
            });
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidWindow(format!(
                "non-finite value at position {}",
                idx
            )));
        }
        Ok(Self { values })
    }

    /// Build a window from raw history, keeping the last `seq_len` finite
    /// points and normalizing them.
    pub fn from_history(
        raw: &[f64],
        normalizer: &dyn Normalizer,
        seq_len: usize,
    ) -> Result<Self, ForecastError> {
        let valid: Vec<f64> = raw.iter().copied().filter(|p| p.is_finite()).collect();
        if valid.len() < seq_len {
            return Err(ForecastError::InsufficientData {
                required: seq_len,
                available: valid.len(),
            });
        }
        let tail = &valid[valid.len() - seq_len..];
        let scaled = normalizer.transform(tail)?;
        Self::new(scaled, seq_len)
    }

    /// Drop the oldest value and append `next`.
    pub fn advance(&self, next: f64) -> Self {
        let mut values = Vec::with_capacity(self.values.len());
        values.extend_from_slice(&self.values[1..]);
        values.push(next);
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    pub timestamp: DateTime<Utc>,
    /// Denormalized price in raw units.
    pub price: f64,
}

/// Completed rollout. Timestamps are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ForecastStep>", into = "Vec<ForecastStep>")]
pub struct Trajectory {
    steps: Vec<ForecastStep>,
}

impl Trajectory {
    pub fn new(steps: Vec<ForecastStep>) -> Result<Self, ForecastError> {
        if let Some(pos) = steps
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(ForecastError::InvalidTrajectory(format!(
                "timestamp at step {} does not advance",
                pos + 1
            )));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ForecastStep] {
        &self.steps
    }

    pub fn prices(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.price).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<ForecastStep> {
        self.steps
    }
}

impl TryFrom<Vec<ForecastStep>> for Trajectory {
    type Error = ForecastError;

    fn try_from(steps: Vec<ForecastStep>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<Trajectory> for Vec<ForecastStep> {
    fn from(trajectory: Trajectory) -> Self {
        trajectory.steps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PointKind {
    /// Minimum price of the trajectory.
    Buy,
    /// Maximum price of the trajectory.
    Sell,
}

impl std::fmt::Display for PointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremumPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub kind: PointKind,
    /// Position of the point inside its trajectory.
    pub index: usize,
}

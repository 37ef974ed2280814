//! Autoregressive rollout with ensemble sampling.
//!
//! Each step draws `K` noise vectors, runs the generator once per vector on
//! `noise ++ window`, combines the draws into the next normalized price and
//! slides the window forward. Steps are strictly sequential; only the draws
//! inside a step are independent.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ForecastConfig;
use crate::error::ForecastError;
use crate::forecast::model::{DenseGenerator, GenerativeModel};
use crate::forecast::normalizer::{MinMaxScaler, Normalizer};
use crate::models::forecast::{ForecastStep, PriceWindow, Trajectory};

/// How the `K` draws of one step are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsembleAggregation {
    #[default]
    Mean,
    Median,
}

impl EnsembleAggregation {
    /// Combine the draws of one step. `None` when there are no draws.
    pub fn combine(self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let value = match self {
            Self::Mean => samples.iter().sum::<f64>() / samples.len() as f64,
            Self::Median => {
                let mut sorted = samples.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        };
        Some(value)
    }
}

impl FromStr for EnsembleAggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(format!("unknown ensemble aggregation '{}'", other)),
        }
    }
}

/// Model and normalizer, initialized once and passed into every engine call.
#[derive(Clone)]
pub struct ForecastContext {
    pub model: Arc<dyn GenerativeModel>,
    pub normalizer: Arc<dyn Normalizer>,
}

impl ForecastContext {
    pub fn new(model: Arc<dyn GenerativeModel>, normalizer: Arc<dyn Normalizer>) -> Self {
        Self { model, normalizer }
    }

    /// Load the JSON generator and scaler artifacts.
    pub fn load(
        model_path: impl AsRef<Path>,
        scaler_path: impl AsRef<Path>,
    ) -> Result<Self, ForecastError> {
        let model = DenseGenerator::load(model_path)?;
        let normalizer = MinMaxScaler::load(scaler_path)?;
        Ok(Self::new(Arc::new(model), Arc::new(normalizer)))
    }
}

#[derive(Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
    context: ForecastContext,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig, context: ForecastContext) -> Result<Self, ForecastError> {
        if config.seq_len == 0 {
            return Err(ForecastError::InvalidWindow(
                "window length must be positive".to_string(),
            ));
        }
        if config.ensemble_size == 0 {
            return Err(ForecastError::Model(
                "ensemble size must be at least 1".to_string(),
            ));
        }
        if config.step_hours <= 0 {
            return Err(ForecastError::InvalidTrajectory(format!(
                "step interval must be positive, got {}h",
                config.step_hours
            )));
        }
        let horizon = i32::try_from(config.future_days)
            .ok()
            .zip(Duration::try_hours(config.step_hours))
            .and_then(|(steps, interval)| interval.checked_mul(steps));
        if horizon.is_none() {
            return Err(ForecastError::InvalidTrajectory(format!(
                "{} steps of {}h exceed the representable time range",
                config.future_days, config.step_hours
            )));
        }
        let expected = config.model_input_dim();
        let actual = context.model.input_dim();
        if actual != expected {
            return Err(ForecastError::Model(format!(
                "model expects {} inputs, rollout provides {} ({} noise + {} window)",
                actual, expected, config.noise_dim, config.seq_len
            )));
        }
        Ok(Self { config, context })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn context(&self) -> &ForecastContext {
        &self.context
    }

    /// Noise source for one run: seeded when configured, entropy otherwise.
    pub fn rng(&self) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Roll the model forward `future_days` steps from `window`.
    ///
    /// `start` is the timestamp of the last observed point; step `i` is
    /// stamped `start + i * step_hours`. Unseeded engines give a different
    /// trajectory on every call.
    pub fn forecast(
        &self,
        window: PriceWindow,
        start: DateTime<Utc>,
    ) -> Result<Trajectory, ForecastError> {
        let mut rng = self.rng();
        self.forecast_with_rng(window, start, &mut rng)
    }

    pub fn forecast_with_rng<R: Rng>(
        &self,
        window: PriceWindow,
        start: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Trajectory, ForecastError> {
        if window.len() != self.config.seq_len {
            return Err(ForecastError::InvalidWindow(format!(
                "window has {} values, engine expects {}",
                window.len(),
                self.config.seq_len
            )));
        }

        let mut window = window;
        let mut scaled = Vec::with_capacity(self.config.future_days);
        for step in 1..=self.config.future_days {
            let (next, advanced) = self.step(&window, rng)?;
            debug!(step, normalized = next, "forecast step");
            scaled.push(next);
            window = advanced;
        }

        let prices = self.context.normalizer.inverse_transform(&scaled)?;
        if prices.len() != scaled.len() {
            return Err(ForecastError::Normalizer(format!(
                "inverse transform returned {} values for {}",
                prices.len(),
                scaled.len()
            )));
        }

        let interval = Duration::try_hours(self.config.step_hours).ok_or_else(|| {
            ForecastError::InvalidTrajectory(format!(
                "step interval {}h out of range",
                self.config.step_hours
            ))
        })?;
        let steps = prices
            .into_iter()
            .enumerate()
            .map(|(i, price)| {
                i32::try_from(i + 1)
                    .ok()
                    .and_then(|n| interval.checked_mul(n))
                    .and_then(|offset| start.checked_add_signed(offset))
                    .map(|timestamp| ForecastStep { timestamp, price })
                    .ok_or_else(|| {
                        ForecastError::InvalidTrajectory(format!(
                            "timestamp of step {} overflows from {}",
                            i + 1,
                            start
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let trajectory = Trajectory::new(steps)?;
        info!(
            steps = trajectory.len(),
            ensemble = self.config.ensemble_size,
            "forecast rollout complete"
        );
        Ok(trajectory)
    }

    /// One autoregressive step: the combined next normalized price and the
    /// window advanced by it.
    pub fn step<R: Rng>(
        &self,
        window: &PriceWindow,
        rng: &mut R,
    ) -> Result<(f64, PriceWindow), ForecastError> {
        let mut inputs = Vec::with_capacity(self.config.ensemble_size);
        for _ in 0..self.config.ensemble_size {
            let mut input = Vec::with_capacity(self.config.model_input_dim());
            for _ in 0..self.config.noise_dim {
                let z: f64 = StandardNormal.sample(&mut *rng);
                input.push(z);
            }
            input.extend_from_slice(window.values());
            inputs.push(input);
        }

        let samples = self.evaluate(&inputs)?;
        let next = match self.config.aggregation.combine(&samples) {
            Some(value) if value.is_finite() => value,
            Some(value) => {
                return Err(ForecastError::Model(format!(
                    "ensemble produced non-finite value {}",
                    value
                )))
            }
            None => {
                return Err(ForecastError::Model(
                    "ensemble produced no draws".to_string(),
                ))
            }
        };
        Ok((next, window.advance(next)))
    }

    #[cfg(feature = "parallel")]
    fn evaluate(&self, inputs: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        use rayon::prelude::*;
        inputs
            .par_iter()
            .map(|input| self.context.model.predict(input))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate(&self, inputs: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        inputs
            .iter()
            .map(|input| self.context.model.predict(input))
            .collect()
    }
}

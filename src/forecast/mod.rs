//! Autoregressive forecasting: artifacts and the rollout engine.

pub mod engine;
pub mod model;
pub mod normalizer;

pub use engine::{EnsembleAggregation, ForecastContext, ForecastEngine};
pub use model::{Activation, DenseGenerator, DenseLayer, GenerativeModel};
pub use normalizer::{MinMaxScaler, Normalizer};

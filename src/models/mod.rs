//! Shared data models spanning the engine layers.

pub mod candle;
pub mod forecast;
pub mod prediction;

pub use candle::Candle;
pub use forecast::{ExtremumPoint, ForecastStep, PointKind, PriceWindow, Trajectory};
pub use prediction::PredictionResult;

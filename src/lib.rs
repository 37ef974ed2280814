//! Forecast-to-ledger engine.
//!
//! Rolls a generative price model forward over a fixed context window,
//! picks the best buy and sell points of the forecast and records them on an
//! EVM ledger with confirmation.

pub mod config;
pub mod core;
pub mod error;
pub mod forecast;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;

pub use error::ForecastError;

//! Environment-derived configuration.
//!
//! Every value has a default so a bare `cargo run` works against a local
//! development node. `.env` files are loaded by the binaries via `dotenvy`.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::forecast::engine::EnsembleAggregation;
use crate::ledger::abi::PriceEncoding;

pub const SEQ_LEN: usize = 20;
pub const FUTURE_DAYS: usize = 30;
pub const NOISE_DIM: usize = 10;
pub const ENSEMBLE_SIZE: usize = 5;
pub const STEP_HOURS: i64 = 24;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:7545";
pub const DEFAULT_CONTRACT_DESCRIPTOR: &str = "build/contracts/Predictions.json";

/// Deployment environment name (`ENVIRONMENT`), lowercased.
pub fn get_environment() -> String {
    env_str("ENVIRONMENT", "sandbox").to_lowercase()
}

fn env_str(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_usize(name: &str, default: usize) -> usize {
    env_opt(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env_opt(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env_opt(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u16(name: &str, default: u16) -> u16 {
    env_opt(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse an enumerated setting, keeping the default when the value is
/// not recognized.
fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env_opt(name) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!(variable = name, value = %raw, error = %e, "ignoring invalid setting, using default");
            default
        }),
        None => default,
    }
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_str(name, default))
}

/// Rollout parameters for the forecast engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    pub seq_len: usize,
    pub future_days: usize,
    pub noise_dim: usize,
    /// Number of model draws averaged per step (`K`).
    pub ensemble_size: usize,
    pub aggregation: EnsembleAggregation,
    pub step_hours: i64,
    /// Seed for the noise source. `None` draws from OS entropy, so repeated
    /// runs on the same window produce different trajectories.
    pub seed: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            seq_len: SEQ_LEN,
            future_days: FUTURE_DAYS,
            noise_dim: NOISE_DIM,
            ensemble_size: ENSEMBLE_SIZE,
            aggregation: EnsembleAggregation::Mean,
            step_hours: STEP_HOURS,
            seed: None,
        }
    }
}

impl ForecastConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            seq_len: env_usize("SEQ_LEN", defaults.seq_len),
            future_days: env_usize("FUTURE_DAYS", defaults.future_days),
            noise_dim: env_usize("NOISE_DIM", defaults.noise_dim),
            ensemble_size: env_usize("ENSEMBLE_SIZE", defaults.ensemble_size).max(1),
            aggregation: env_parse("ENSEMBLE_AGGREGATION", defaults.aggregation),
            step_hours: env_i64("FORECAST_STEP_HOURS", defaults.step_hours),
            seed: env_opt("FORECAST_SEED").and_then(|s| s.parse().ok()),
        }
    }

    /// Width of the generative model input (noise followed by the window).
    pub fn model_input_dim(&self) -> usize {
        self.noise_dim + self.seq_len
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Ledger connection and confirmation policy.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub descriptor_path: PathBuf,
    /// Sender account. There is no fallback to the node's first account.
    pub account: Option<String>,
    pub gas_limit: Option<u64>,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    /// Backoff retries for a receipt query that errors out.
    pub receipt_retry_max: usize,
    pub price_encoding: PriceEncoding,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            descriptor_path: PathBuf::from(DEFAULT_CONTRACT_DESCRIPTOR),
            account: None,
            gas_limit: None,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
            receipt_retry_max: 3,
            price_encoding: PriceEncoding::Truncate,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rpc_url: env_str("LEDGER_RPC_URL", DEFAULT_RPC_URL),
            descriptor_path: env_path("CONTRACT_DESCRIPTOR", DEFAULT_CONTRACT_DESCRIPTOR),
            account: env_opt("LEDGER_ACCOUNT"),
            gas_limit: env_opt("LEDGER_GAS_LIMIT").and_then(|s| s.parse().ok()),
            confirmation_timeout: Duration::from_secs(env_u64(
                "CONFIRMATION_TIMEOUT_SECS",
                defaults.confirmation_timeout.as_secs(),
            )),
            poll_interval: Duration::from_millis(env_u64(
                "RECEIPT_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )),
            receipt_retry_max: env_usize("RECEIPT_RETRY_MAX", defaults.receipt_retry_max),
            price_encoding: env_parse("PRICE_ENCODING", defaults.price_encoding),
        }
    }
}

/// Top-level configuration shared by the binaries.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub market_data_dir: PathBuf,
    pub forecast: ForecastConfig,
    pub ledger: LedgerConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_u16("PORT", 8080),
            model_path: env_path("MODEL_PATH", "generator.json"),
            scaler_path: env_path("SCALER_PATH", "scaler.json"),
            market_data_dir: env_path("MARKET_DATA_DIR", "data"),
            forecast: ForecastConfig::from_env(),
            ledger: LedgerConfig::from_env(),
        }
    }
}

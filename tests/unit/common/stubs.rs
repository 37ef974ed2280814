//! Test doubles shared by the unit tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use forecast_ledger::config::ForecastConfig;
use forecast_ledger::error::ForecastError;
use forecast_ledger::forecast::engine::{ForecastContext, ForecastEngine};
use forecast_ledger::forecast::model::GenerativeModel;
use forecast_ledger::forecast::normalizer::MinMaxScaler;
use forecast_ledger::ledger::client::{LedgerClient, TransactionReceipt};
use forecast_ledger::ledger::error::LedgerError;
use forecast_ledger::models::candle::Candle;
use forecast_ledger::models::forecast::{ExtremumPoint, ForecastStep, PointKind, Trajectory};

/// Adds `drift` to the newest window value. Ignores the noise block.
pub struct DriftModel {
    pub input_dim: usize,
    pub drift: f64,
}

impl GenerativeModel for DriftModel {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict(&self, input: &[f64]) -> Result<f64, ForecastError> {
        let last = input.last().copied().unwrap_or(0.0);
        Ok(last + self.drift)
    }
}

/// Newest window value shifted by a tenth of the first noise draw.
pub struct NoisyModel {
    pub input_dim: usize,
}

impl GenerativeModel for NoisyModel {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict(&self, input: &[f64]) -> Result<f64, ForecastError> {
        Ok(input[input.len() - 1] + 0.1 * input[0])
    }
}

pub struct NanModel {
    pub input_dim: usize,
}

impl GenerativeModel for NanModel {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict(&self, _input: &[f64]) -> Result<f64, ForecastError> {
        Ok(f64::NAN)
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// Scaler mapping raw `[0, 100]` onto `[0, 1]`.
pub fn percent_scaler() -> MinMaxScaler {
    MinMaxScaler::new(0.0, 100.0).unwrap()
}

pub fn drift_engine(config: ForecastConfig, drift: f64) -> ForecastEngine {
    let model = DriftModel {
        input_dim: config.model_input_dim(),
        drift,
    };
    let context = ForecastContext::new(Arc::new(model), Arc::new(percent_scaler()));
    ForecastEngine::new(config, context).unwrap()
}

pub fn noisy_engine(config: ForecastConfig) -> ForecastEngine {
    let model = NoisyModel {
        input_dim: config.model_input_dim(),
    };
    let context = ForecastContext::new(Arc::new(model), Arc::new(percent_scaler()));
    ForecastEngine::new(config, context).unwrap()
}

pub fn daily_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| Candle::from_close(*close, t0() + Duration::days(i as i64)))
        .collect()
}

pub fn trajectory_of(prices: &[f64]) -> Trajectory {
    let steps = prices
        .iter()
        .enumerate()
        .map(|(i, price)| ForecastStep {
            timestamp: t0() + Duration::days(i as i64 + 1),
            price: *price,
        })
        .collect();
    Trajectory::new(steps).unwrap()
}

pub fn point(kind: PointKind, price: f64, index: usize) -> ExtremumPoint {
    ExtremumPoint {
        timestamp: t0() + Duration::days(index as i64 + 1),
        price,
        kind,
        index,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ReceiptPlan {
    Mined { status: u64 },
    /// Never mined.
    Pending,
    /// Receipt queries error out `failures` times before the receipt shows up.
    Flaky { failures: usize },
}

/// Scripted ledger. Transaction hashes encode the submission index so each
/// submission can follow its own [`ReceiptPlan`].
#[derive(Default)]
pub struct MockLedgerClient {
    unavailable: Option<String>,
    rejected: Vec<usize>,
    plans: Vec<ReceiptPlan>,
    submitted: Mutex<Vec<(String, u64)>>,
    receipt_queries: AtomicUsize,
    flaky_failures: AtomicUsize,
}

impl MockLedgerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(mut self, reason: &str) -> Self {
        self.unavailable = Some(reason.to_string());
        self
    }

    /// Reject the submission with this zero-based index.
    pub fn reject(mut self, index: usize) -> Self {
        self.rejected.push(index);
        self
    }

    pub fn with_plans(mut self, plans: Vec<ReceiptPlan>) -> Self {
        self.plans = plans;
        self
    }

    pub fn submitted(&self) -> Vec<(String, u64)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn receipt_queries(&self) -> usize {
        self.receipt_queries.load(Ordering::SeqCst)
    }

    fn plan(&self, index: usize) -> ReceiptPlan {
        self.plans
            .get(index)
            .copied()
            .unwrap_or(ReceiptPlan::Mined { status: 1 })
    }
}

fn receipt(tx_hash: &str, status: u64) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash.to_string(),
        block_hash: format!("0x{:064x}", 0xb10c),
        block_number: 7,
        gas_used: 48_000,
        effective_gas_price: 20_000_000_000,
        cumulative_gas_used: 48_000,
        status,
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn ensure_available(&self) -> Result<(), LedgerError> {
        match self.unavailable {
            Some(ref reason) => Err(LedgerError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    async fn submit_store_prediction(
        &self,
        symbol: &str,
        encoded_price: u64,
    ) -> Result<String, LedgerError> {
        let mut submitted = self.submitted.lock().unwrap();
        let index = submitted.len();
        submitted.push((symbol.to_string(), encoded_price));
        if self.rejected.contains(&index) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: "insufficient funds for gas".to_string(),
            });
        }
        Ok(format!("0x{:064x}", index))
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, LedgerError> {
        self.receipt_queries.fetch_add(1, Ordering::SeqCst);
        let index = usize::from_str_radix(&tx_hash[2..], 16).unwrap();
        match self.plan(index) {
            ReceiptPlan::Mined { status } => Ok(Some(receipt(tx_hash, status))),
            ReceiptPlan::Pending => Ok(None),
            ReceiptPlan::Flaky { failures } => {
                if self.flaky_failures.fetch_add(1, Ordering::SeqCst) < failures {
                    Err(LedgerError::Transport("connection reset".to_string()))
                } else {
                    Ok(Some(receipt(tx_hash, 1)))
                }
            }
        }
    }
}

//! Sequential, confirmed ledger writes for selected trade points.
//!
//! Each point walks `Pending -> Submitted -> Confirmed | Failed`. Points are
//! independent transactions: a failed BUY does not stop the SELL, and a
//! confirmed write is never rolled back.

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::LedgerConfig;
use crate::ledger::abi::{encode_price, PriceEncoding};
use crate::ledger::client::{LedgerClient, TransactionReceipt};
use crate::ledger::error::{LedgerError, LedgerFailure};
use crate::metrics::Metrics;
use crate::models::forecast::{ExtremumPoint, PointKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl SubmissionState {
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Pending, Submitted) | (Pending, Failed) | (Submitted, Confirmed) | (Submitted, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    Success,
    Failed,
}

/// Receipt-backed record of one mined write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub symbol: String,
    pub encoded_price: u64,
    pub transaction_hash: String,
    pub block_hash: String,
    pub gas_used: u64,
    pub gas_price: u64,
    pub cumulative_gas_used: u64,
    pub status: RecordStatus,
}

impl LedgerRecord {
    fn from_receipt(symbol: &str, encoded_price: u64, receipt: &TransactionReceipt) -> Self {
        Self {
            symbol: symbol.to_string(),
            encoded_price,
            transaction_hash: receipt.transaction_hash.clone(),
            block_hash: receipt.block_hash.clone(),
            gas_used: receipt.gas_used,
            gas_price: receipt.effective_gas_price,
            cumulative_gas_used: receipt.cumulative_gas_used,
            status: if receipt.is_success() {
                RecordStatus::Success
            } else {
                RecordStatus::Failed
            },
        }
    }
}

/// Final outcome for one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub kind: PointKind,
    pub symbol: String,
    pub price: f64,
    pub encoded_price: Option<u64>,
    pub state: SubmissionState,
    pub transaction_hash: Option<String>,
    /// Present whenever a receipt came back, reverted ones included.
    pub record: Option<LedgerRecord>,
    pub failure: Option<LedgerFailure>,
}

impl Submission {
    fn pending(symbol: &str, point: &ExtremumPoint) -> Self {
        Self {
            kind: point.kind,
            symbol: symbol.to_string(),
            price: point.price,
            encoded_price: None,
            state: SubmissionState::Pending,
            transaction_hash: None,
            record: None,
            failure: None,
        }
    }

    fn advance(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(
            symbol = %self.symbol,
            kind = %self.kind,
            from = ?self.state,
            to = ?next,
            "ledger submission transition"
        );
        self.state = next;
    }

    fn fail(mut self, failure: LedgerFailure) -> Self {
        warn!(
            symbol = %self.symbol,
            kind = %self.kind,
            tx_hash = ?self.transaction_hash,
            failure = %failure,
            "ledger submission failed"
        );
        self.advance(SubmissionState::Failed);
        self.failure = Some(failure);
        self
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == SubmissionState::Confirmed
    }
}

/// Outcome of the whole write stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LedgerOutcome {
    /// One entry per input point, in input order.
    Recorded { submissions: Vec<Submission> },
    Skipped { reason: String },
}

impl LedgerOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn submissions(&self) -> &[Submission] {
        match self {
            Self::Recorded { submissions } => submissions,
            Self::Skipped { .. } => &[],
        }
    }

    pub fn confirmed_count(&self) -> usize {
        self.submissions().iter().filter(|s| s.is_confirmed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.submissions()
            .iter()
            .filter(|s| s.state == SubmissionState::Failed)
            .count()
    }
}

/// Confirmation policy applied to every point.
#[derive(Debug, Clone)]
pub struct WriterPolicy {
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub receipt_retry_max: usize,
    pub price_encoding: PriceEncoding,
}

impl From<&LedgerConfig> for WriterPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
            receipt_retry_max: config.receipt_retry_max,
            price_encoding: config.price_encoding,
        }
    }
}

impl Default for WriterPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

/// Abandons the confirmation wait of a writer.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

pub struct LedgerWriter {
    client: Arc<dyn LedgerClient>,
    policy: WriterPolicy,
    /// Single-writer discipline over the sender account's nonce sequence.
    submit_lock: Mutex<()>,
    cancel: Arc<watch::Sender<bool>>,
    metrics: Option<Arc<Metrics>>,
}

impl LedgerWriter {
    pub fn new(client: Arc<dyn LedgerClient>, policy: WriterPolicy) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            client,
            policy,
            submit_lock: Mutex::new(()),
            cancel: Arc::new(cancel),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> &WriterPolicy {
        &self.policy
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel.clone(),
        }
    }

    /// Clear a previous cancellation so the writer accepts new work.
    pub fn reset(&self) {
        self.cancel.send_replace(false);
    }

    /// Write each point in order, waiting for confirmation before the next.
    ///
    /// Never fails as a whole: an unavailable ledger yields
    /// [`LedgerOutcome::Skipped`], per-point problems land in that point's
    /// [`Submission`].
    pub async fn record(&self, symbol: &str, points: &[ExtremumPoint]) -> LedgerOutcome {
        let _guard = self.submit_lock.lock().await;

        if let Err(e) = self.client.ensure_available().await {
            warn!(symbol = %symbol, error = %e, "ledger write stage skipped");
            if let Some(ref metrics) = self.metrics {
                metrics.ledger_skipped_total.inc();
            }
            return LedgerOutcome::Skipped {
                reason: e.to_string(),
            };
        }

        let mut submissions = Vec::with_capacity(points.len());
        for point in points {
            let submission = self.submit_point(symbol, point).await;
            if let Some(ref metrics) = self.metrics {
                if submission.is_confirmed() {
                    metrics.ledger_confirmed_total.inc();
                } else {
                    metrics.ledger_failed_total.inc();
                }
            }
            submissions.push(submission);
        }

        info!(
            symbol = %symbol,
            confirmed = submissions.iter().filter(|s| s.is_confirmed()).count(),
            total = submissions.len(),
            "ledger write stage finished"
        );
        LedgerOutcome::Recorded { submissions }
    }

    async fn submit_point(&self, symbol: &str, point: &ExtremumPoint) -> Submission {
        let mut submission = Submission::pending(symbol, point);

        if *self.cancel.borrow() {
            return submission.fail(LedgerFailure::Cancelled);
        }

        let encoded = match encode_price(point.price, self.policy.price_encoding) {
            Ok(value) => value,
            Err(e) => {
                return submission.fail(LedgerFailure::Encoding {
                    message: e.to_string(),
                })
            }
        };
        submission.encoded_price = Some(encoded);

        if let Some(ref metrics) = self.metrics {
            metrics.ledger_submissions_total.inc();
        }
        let tx_hash = match self.client.submit_store_prediction(symbol, encoded).await {
            Ok(hash) => hash,
            Err(e) => {
                error!(symbol = %symbol, kind = %point.kind, error = %e, "ledger submission rejected");
                return submission.fail(LedgerFailure::Submission {
                    message: e.to_string(),
                });
            }
        };
        submission.transaction_hash = Some(tx_hash.clone());
        submission.advance(SubmissionState::Submitted);
        info!(symbol = %symbol, kind = %point.kind, tx_hash = %tx_hash, encoded_price = encoded, "ledger transaction submitted");

        match self.await_confirmation(&tx_hash).await {
            Ok(receipt) => {
                let record = LedgerRecord::from_receipt(symbol, encoded, &receipt);
                submission.record = Some(record);
                if receipt.is_success() {
                    submission.advance(SubmissionState::Confirmed);
                    info!(
                        symbol = %symbol,
                        kind = %point.kind,
                        tx_hash = %tx_hash,
                        block_hash = %receipt.block_hash,
                        gas_used = receipt.gas_used,
                        "ledger transaction confirmed"
                    );
                    submission
                } else {
                    submission.fail(LedgerFailure::Reverted)
                }
            }
            Err(failure) => submission.fail(failure),
        }
    }

    /// Wait for the receipt, bounded by the confirmation timeout and
    /// abandoned on cancellation.
    async fn await_confirmation(&self, tx_hash: &str) -> Result<TransactionReceipt, LedgerFailure> {
        let mut cancelled = self.cancel.subscribe();
        let started = Instant::now();
        let bounded = tokio::time::timeout(self.policy.confirmation_timeout, self.poll_receipt(tx_hash));

        tokio::select! {
            outcome = bounded => match outcome {
                Ok(result) => result,
                Err(_) => Err(LedgerFailure::ConfirmationTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                }),
            },
            _ = async { let _ = cancelled.wait_for(|c| *c).await; } => Err(LedgerFailure::Cancelled),
        }
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt, LedgerFailure> {
        loop {
            let backoff = ExponentialBuilder::default()
                .with_min_delay(self.policy.poll_interval)
                .with_max_times(self.policy.receipt_retry_max);

            let receipt = (|| async { self.client.transaction_receipt(tx_hash).await })
                .retry(backoff)
                .when(LedgerError::is_transient)
                .notify(|e: &LedgerError, delay: Duration| {
                    warn!(tx_hash = %tx_hash, error = %e, delay_ms = delay.as_millis() as u64, "receipt query failed, retrying");
                })
                .await
                .map_err(|e| LedgerFailure::Receipt {
                    message: e.to_string(),
                })?;

            match receipt {
                Some(receipt) => return Ok(receipt),
                None => tokio::time::sleep(self.policy.poll_interval).await,
            }
        }
    }
}

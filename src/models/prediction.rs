use serde::{Deserialize, Serialize};

use crate::ledger::writer::LedgerOutcome;
use crate::models::forecast::{ExtremumPoint, Trajectory};

/// Result surface of one pipeline run.
///
/// The forecast half is always fully populated; `ledger_records` reports the
/// write stage independently, including when it was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: String,
    pub trajectory: Trajectory,
    pub buy: ExtremumPoint,
    pub sell: ExtremumPoint,
    pub ledger_records: LedgerOutcome,
}

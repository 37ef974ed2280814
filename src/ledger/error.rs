use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Missing descriptor, missing account or unreachable node. Skips the
    /// whole write stage.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("invalid contract descriptor: {0}")]
    Descriptor(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Errors worth retrying when polling for a receipt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Rpc { .. } | Self::InvalidResponse(_)
        )
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Why a single point ended in the failed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LedgerFailure {
    /// Mined with a non-success receipt status.
    Reverted,
    Encoding { message: String },
    Submission { message: String },
    Receipt { message: String },
    ConfirmationTimeout { waited_ms: u64 },
    Cancelled,
}

impl std::fmt::Display for LedgerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reverted => write!(f, "transaction reverted"),
            Self::Encoding { message } => write!(f, "encoding failed: {message}"),
            Self::Submission { message } => write!(f, "submission failed: {message}"),
            Self::Receipt { message } => write!(f, "receipt query failed: {message}"),
            Self::ConfirmationTimeout { waited_ms } => {
                write!(f, "no confirmation after {waited_ms}ms")
            }
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

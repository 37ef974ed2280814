//! Ledger write stage: contract resolution, call encoding, JSON-RPC
//! submission and confirmation tracking.

pub mod abi;
pub mod client;
pub mod descriptor;
pub mod error;
pub mod writer;

pub use abi::{encode_price, PriceEncoding};
pub use client::{JsonRpcLedgerClient, LedgerClient, TransactionReceipt};
pub use descriptor::{ContractDescriptor, ResolvedContract};
pub use error::{LedgerError, LedgerFailure};
pub use writer::{
    CancelHandle, LedgerOutcome, LedgerRecord, LedgerWriter, RecordStatus, Submission,
    SubmissionState, WriterPolicy,
};

//! Ledger client seam and the EVM JSON-RPC implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::ledger::abi::{self, STORE_PREDICTION};
use crate::ledger::descriptor::{ContractDescriptor, ResolvedContract};
use crate::ledger::error::LedgerError;

/// Mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    pub effective_gas_price: u64,
    pub cumulative_gas_used: u64,
    pub status: u64,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == 1
    }
}

/// Connection, contract and sender account behind the write stage.
///
/// Every call goes out through the same sender account, so callers must
/// serialize submissions.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fails with [`LedgerError::Unavailable`] when nothing can be written.
    async fn ensure_available(&self) -> Result<(), LedgerError>;

    /// Send `storePrediction(symbol, encoded_price)`, returning the
    /// transaction hash.
    async fn submit_store_prediction(
        &self,
        symbol: &str,
        encoded_price: u64,
    ) -> Result<String, LedgerError>;

    /// `None` while the transaction is not mined yet.
    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_hash: String,
    block_number: String,
    gas_used: String,
    #[serde(default)]
    effective_gas_price: Option<String>,
    cumulative_gas_used: String,
    #[serde(default)]
    status: Option<String>,
}

impl RawReceipt {
    fn into_receipt(self) -> Result<TransactionReceipt, LedgerError> {
        Ok(TransactionReceipt {
            block_number: parse_quantity(&self.block_number)?,
            gas_used: parse_quantity(&self.gas_used)?,
            effective_gas_price: self
                .effective_gas_price
                .as_deref()
                .map(parse_quantity)
                .transpose()?
                .unwrap_or(0),
            cumulative_gas_used: parse_quantity(&self.cumulative_gas_used)?,
            // Receipts without a status field predate status codes; treat
            // inclusion as success.
            status: self
                .status
                .as_deref()
                .map(parse_quantity)
                .transpose()?
                .unwrap_or(1),
            transaction_hash: self.transaction_hash,
            block_hash: self.block_hash,
        })
    }
}

fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::InvalidResponse(format!("quantity '{}' lacks 0x", raw)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::InvalidResponse(format!("quantity '{}': {}", raw, e)))
}

/// JSON-RPC client for an EVM node holding the sender account.
///
/// Transactions go through `eth_sendTransaction`, so the node signs with the
/// explicitly configured account. No key material is handled here.
pub struct JsonRpcLedgerClient {
    http: reqwest::Client,
    rpc_url: String,
    account: Option<String>,
    gas_limit: Option<u64>,
    contract: Result<ResolvedContract, LedgerError>,
    next_id: AtomicU64,
}

impl JsonRpcLedgerClient {
    /// Load the descriptor named by the config. A missing or unusable
    /// descriptor yields a client that reports itself unavailable.
    pub fn new(config: &LedgerConfig) -> Self {
        let descriptor = ContractDescriptor::load(&config.descriptor_path);
        Self::with_descriptor(config, descriptor, reqwest::Client::new())
    }

    pub fn with_descriptor(
        config: &LedgerConfig,
        descriptor: Result<ContractDescriptor, LedgerError>,
        http: reqwest::Client,
    ) -> Self {
        let contract = descriptor.and_then(|d| d.resolve(STORE_PREDICTION));

        Self {
            http,
            rpc_url: config.rpc_url.clone(),
            account: config.account.clone(),
            gas_limit: config.gas_limit,
            contract,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn contract(&self) -> Option<&ResolvedContract> {
        self.contract.as_ref().ok()
    }

    fn resolved(&self) -> Result<(&ResolvedContract, &str), LedgerError> {
        let contract = self.contract.as_ref().map_err(Clone::clone)?;
        let account = self.account.as_deref().ok_or_else(|| {
            LedgerError::Unavailable("no sender account configured".to_string())
        })?;
        Ok((contract, account))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "ledger rpc call");
        let response = self.http.post(&self.rpc_url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        if let Some(err) = envelope.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| LedgerError::InvalidResponse(format!("{}: {}", method, e)))
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn ensure_available(&self) -> Result<(), LedgerError> {
        self.resolved()?;
        let chain_id: String = self.call("eth_chainId", json!([])).await.map_err(|e| {
            LedgerError::Unavailable(format!("ledger node at {} unreachable: {}", self.rpc_url, e))
        })?;
        debug!(chain_id = %chain_id, "ledger node reachable");
        Ok(())
    }

    async fn submit_store_prediction(
        &self,
        symbol: &str,
        encoded_price: u64,
    ) -> Result<String, LedgerError> {
        let (contract, account) = self.resolved()?;
        let data = abi::encode_store_prediction(&contract.signature, symbol, encoded_price)?;

        let mut tx = json!({
            "from": account,
            "to": contract.address,
            "data": abi::to_hex(&data),
        });
        if let Some(gas) = self.gas_limit {
            tx["gas"] = Value::String(format!("0x{:x}", gas));
        }

        self.call("eth_sendTransaction", json!([tx])).await
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, LedgerError> {
        let raw: Option<RawReceipt> = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        raw.map(RawReceipt::into_receipt).transpose()
    }
}

//! Contract descriptor: the build artifact carrying `abi` and `networks`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::ledger::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
}

fn default_entry_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractDescriptor {
    #[serde(default)]
    pub abi: Vec<AbiEntry>,
    /// Network id to deployment info, in file order.
    #[serde(default)]
    pub networks: Map<String, Value>,
}

/// Deployed address plus the canonical signature of the target method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContract {
    pub address: String,
    pub signature: String,
}

impl ContractDescriptor {
    /// Load a descriptor file. A missing file makes the ledger unavailable
    /// rather than invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LedgerError::Unavailable(format!(
                "contract descriptor not found at {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(raw).map_err(|e| LedgerError::Descriptor(e.to_string()))
    }

    /// Address of the first network entry that carries one.
    pub fn address(&self) -> Result<String, LedgerError> {
        let address = self
            .networks
            .values()
            .find_map(|network| network.get("address").and_then(Value::as_str))
            .ok_or_else(|| {
                LedgerError::Unavailable("descriptor has no deployed network".to_string())
            })?;

        if !is_address(address) {
            return Err(LedgerError::Descriptor(format!(
                "malformed contract address '{}'",
                address
            )));
        }
        Ok(address.to_string())
    }

    /// Canonical signature such as `storePrediction(string,uint256)`.
    pub fn function_signature(&self, name: &str) -> Result<String, LedgerError> {
        let entry = self
            .abi
            .iter()
            .find(|e| e.kind == "function" && e.name.as_deref() == Some(name))
            .ok_or_else(|| {
                LedgerError::Descriptor(format!("abi has no function '{}'", name))
            })?;

        let params: Vec<&str> = entry.inputs.iter().map(|p| p.kind.as_str()).collect();
        Ok(format!("{}({})", name, params.join(",")))
    }

    pub fn resolve(&self, function: &str) -> Result<ResolvedContract, LedgerError> {
        Ok(ResolvedContract {
            address: self.address()?,
            signature: self.function_signature(function)?,
        })
    }
}

fn is_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

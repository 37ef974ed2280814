//! Price fixed-point encoding and `storePrediction` call data.
//!
//! Prices are stored as integer cents. Anything past the second decimal is
//! dropped at this boundary and cannot be recovered from the ledger.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::str::FromStr;

use crate::ledger::error::LedgerError;

pub const STORE_PREDICTION: &str = "storePrediction";

const WORD: usize = 32;

/// Rule for turning `price * 100` into an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceEncoding {
    /// Drop the fractional cents: `123.456 -> 12345`.
    #[default]
    Truncate,
    /// Round half away from zero: `123.456 -> 12346`.
    Round,
}

impl FromStr for PriceEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "round" => Ok(Self::Round),
            other => Err(format!("unknown price encoding '{}'", other)),
        }
    }
}

/// Encode a raw price as integer cents.
pub fn encode_price(price: f64, encoding: PriceEncoding) -> Result<u64, LedgerError> {
    if !price.is_finite() || price < 0.0 {
        return Err(LedgerError::Encoding(format!(
            "price {} cannot be stored as unsigned cents",
            price
        )));
    }

    // 1.13 * 100 is 112.99999999999999 in binary floating point.
    let cents = ((price * 100.0) * 1e6).round() / 1e6;
    let value = match encoding {
        PriceEncoding::Truncate => cents.trunc(),
        PriceEncoding::Round => cents.round(),
    };

    if value >= u64::MAX as f64 {
        return Err(LedgerError::Encoding(format!(
            "price {} overflows 64-bit cents",
            price
        )));
    }
    Ok(value as u64)
}

/// First four bytes of the keccak-256 hash of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Call data for `name(string, uintN)`.
pub fn encode_store_prediction(
    signature: &str,
    symbol: &str,
    encoded_price: u64,
) -> Result<Vec<u8>, LedgerError> {
    let bits = price_param_bits(signature)?;
    if bits < 64 && encoded_price >> bits != 0 {
        return Err(LedgerError::Encoding(format!(
            "{} does not fit uint{}",
            encoded_price, bits
        )));
    }

    let symbol_bytes = symbol.as_bytes();
    let padded_len = symbol_bytes.len().div_ceil(WORD) * WORD;

    let mut data = Vec::with_capacity(4 + 3 * WORD + padded_len);
    data.extend_from_slice(&selector(signature));
    // Head: offset of the dynamic string, then the static price.
    data.extend_from_slice(&uint_word(2 * WORD as u64));
    data.extend_from_slice(&uint_word(encoded_price));
    // Tail: string length and right-padded bytes.
    data.extend_from_slice(&uint_word(symbol_bytes.len() as u64));
    data.extend_from_slice(symbol_bytes);
    data.resize(4 + 3 * WORD + padded_len, 0);
    Ok(data)
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Width of the price parameter, checking the `(string, uintN)` shape.
fn price_param_bits(signature: &str) -> Result<u32, LedgerError> {
    let params = signature
        .split_once('(')
        .and_then(|(_, rest)| rest.strip_suffix(')'))
        .ok_or_else(|| LedgerError::Encoding(format!("malformed signature '{}'", signature)))?;

    let kinds: Vec<&str> = params.split(',').map(str::trim).collect();
    match kinds.as_slice() {
        ["string", uint] => parse_uint_bits(uint).ok_or_else(|| {
            LedgerError::Encoding(format!("unsupported price parameter '{}'", uint))
        }),
        _ => Err(LedgerError::Encoding(format!(
            "expected (string,uintN) parameters, got ({})",
            params
        ))),
    }
}

fn parse_uint_bits(kind: &str) -> Option<u32> {
    let bits: u32 = kind.strip_prefix("uint")?.parse().ok()?;
    (bits % 8 == 0 && (8..=256).contains(&bits)).then_some(bits)
}

//! Wallet address validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why an address string was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("not valid base58: {0}")]
    Encoding(String),
    #[error("decoded to {0} bytes, expected 32")]
    Length(usize),
}

/// A validated Solana wallet address (base58-encoded 32-byte public key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and validate. Any decode failure means a malformed address,
    /// regardless of the input's length.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| AddressError::Encoding(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(AddressError::Length(bytes.len()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// === Wallet address tests ===

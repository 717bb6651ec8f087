//! Token identifiers and wallet holding snapshots.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wrapped-SOL mint. The native coin is keyed by this mint everywhere, so a
/// token whose symbol happens to be "SOL" can never shadow it.
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

/// Canonical token identifier: the SPL mint address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(CompactString);

impl TokenId {
    pub fn new(mint: impl AsRef<str>) -> Self {
        Self(CompactString::new(mint.as_ref()))
    }

    /// Identifier for the native coin.
    pub fn native() -> Self {
        Self(CompactString::const_new(NATIVE_MINT))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_MINT
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A token type and the wallet's balance of it, captured at inspection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// Mint address.
    pub id: TokenId,
    /// Ticker symbol, display only.
    pub symbol: CompactString,
    /// Human-readable name.
    pub name: CompactString,
    /// Balance in whole tokens (already divided by 10^decimals).
    pub balance: f64,
    /// On-chain decimal places.
    pub decimals: u8,
}

impl TokenHolding {
    /// Native SOL holding.
    pub fn native(balance: f64) -> Self {
        Self {
            id: TokenId::native(),
            symbol: CompactString::const_new("SOL"),
            name: CompactString::const_new("Solana"),
            balance,
            decimals: 9,
        }
    }

    /// SPL token holding.
    pub fn token(
        mint: impl AsRef<str>,
        symbol: impl AsRef<str>,
        name: impl AsRef<str>,
        balance: f64,
        decimals: u8,
    ) -> Self {
        Self {
            id: TokenId::new(mint),
            symbol: CompactString::new(symbol.as_ref()),
            name: CompactString::new(name.as_ref()),
            balance,
            decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        self.id.is_native()
    }

    /// Case-insensitive symbol match on trimmed input.
    pub fn matches_symbol(&self, input: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(input.trim())
    }
}

// === Token tests ===

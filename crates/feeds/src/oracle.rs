//! Token price lookups.

use crate::FeedError;
use async_trait::async_trait;
use solwatch_core::TokenId;
use std::time::Duration;
use tracing::debug;

/// Default Jupiter price API endpoint.
pub const JUPITER_PRICE_URL: &str = "https://price.jup.ag/v4/price";

/// Current USD price source for a token.
///
/// `Ok(None)` means the source has no usable price right now; callers treat
/// that as "skip this cycle", not as a fault.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price_usd(&self, token: &TokenId) -> Result<Option<f64>, FeedError>;
}

/// Jupiter price API client.
pub struct JupiterOracle {
    client: reqwest::Client,
    base_url: String,
}

impl JupiterOracle {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

/// Extract the price for `mint` from a Jupiter price response.
///
/// Response shape: `{"data": {"<mint>": {"id": "...", "price": 1.23}}}`.
/// Non-positive and non-finite prices are unusable.
fn parse_price(json: &serde_json::Value, mint: &str) -> Option<f64> {
    let price = json["data"][mint]["price"].as_f64()?;
    if price.is_finite() && price > 0.0 {
        Some(price)
    } else {
        None
    }
}

#[async_trait]
impl PriceOracle for JupiterOracle {
    async fn price_usd(&self, token: &TokenId) -> Result<Option<f64>, FeedError> {
        let url = format!("{}?ids={}", self.base_url, token.as_str());

        // Fail open: a transport hiccup means no price this cycle.
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("price request failed for {}: {}", token, e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            debug!("price API returned HTTP {} for {}", response.status(), token);
            return Ok(None);
        }

        let json: serde_json::Value = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                debug!("failed to decode price response for {}: {}", token, e);
                return Ok(None);
            }
        };

        Ok(parse_price(&json, token.as_str()))
    }
}

// === Oracle tests ===

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn test_parse_price() {
        let json = serde_json::json!({
            "data": {
                USDC_MINT: { "id": USDC_MINT, "mintSymbol": "USDC", "price": 0.9998 }
            },
            "timeTaken": 0.002
        });
        assert_eq!(parse_price(&json, USDC_MINT), Some(0.9998));
    }

    #[test]
    fn test_parse_price_missing_mint() {
        let json = serde_json::json!({ "data": {} });
        assert_eq!(parse_price(&json, USDC_MINT), None);
    }

    #[test]
    fn test_parse_price_rejects_non_positive() {
        let zero = serde_json::json!({ "data": { USDC_MINT: { "price": 0.0 } } });
        assert_eq!(parse_price(&zero, USDC_MINT), None);

        let negative = serde_json::json!({ "data": { USDC_MINT: { "price": -1.0 } } });
        assert_eq!(parse_price(&negative, USDC_MINT), None);
    }

    #[test]
    fn test_parse_price_rejects_non_numeric() {
        let json = serde_json::json!({ "data": { USDC_MINT: { "price": "1.0" } } });
        assert_eq!(parse_price(&json, USDC_MINT), None);
    }
}

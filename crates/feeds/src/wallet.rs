//! Wallet holdings via Solana JSON-RPC.

use crate::FeedError;
use async_trait::async_trait;
use serde_json::json;
use solwatch_core::{TokenHolding, WalletAddress};
use std::time::Duration;

/// Default mainnet RPC endpoint.
pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// SPL token program, owner of all token accounts we enumerate.
const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Well-known mints with human-readable metadata. Anything else falls back
/// to a shortened mint as its symbol.
const KNOWN_TOKENS: &[(&str, &str, &str)] = &[
    ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC", "USD Coin"),
    ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT", "Tether USD"),
    ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK", "Bonk"),
    ("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "JUP", "Jupiter"),
    ("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL", "Marinade staked SOL"),
];

/// Enumerates what a wallet currently holds.
#[async_trait]
pub trait WalletInspector: Send + Sync {
    /// Current holdings, native SOL always first.
    async fn holdings(&self, wallet: &WalletAddress) -> Result<Vec<TokenHolding>, FeedError>;
}

/// JSON-RPC backed inspector.
pub struct RpcWalletInspector {
    client: reqwest::Client,
    endpoint: String,
}

impl RpcWalletInspector {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, FeedError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Rpc(format!("HTTP {}", response.status())));
        }

        let mut json: serde_json::Value = response.json().await?;
        if let Some(error) = json.get("error") {
            return Err(FeedError::Rpc(error.to_string()));
        }
        Ok(json["result"].take())
    }
}

#[async_trait]
impl WalletInspector for RpcWalletInspector {
    async fn holdings(&self, wallet: &WalletAddress) -> Result<Vec<TokenHolding>, FeedError> {
        let balance = self
            .rpc_call("getBalance", json!([wallet.as_str()]))
            .await?;
        let lamports = balance["value"]
            .as_u64()
            .ok_or_else(|| FeedError::Parse("getBalance result missing value".to_string()))?;

        let mut holdings = vec![TokenHolding::native(lamports_to_sol(lamports))];

        let accounts = self
            .rpc_call(
                "getTokenAccountsByOwner",
                json!([
                    wallet.as_str(),
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed" },
                ]),
            )
            .await?;
        holdings.extend(parse_token_accounts(&accounts));

        Ok(holdings)
    }
}

fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1e9
}

/// Metadata for a mint, if we recognise it.
fn known_token(mint: &str) -> Option<(&'static str, &'static str)> {
    KNOWN_TOKENS
        .iter()
        .find(|(known, _, _)| *known == mint)
        .map(|(_, symbol, name)| (*symbol, *name))
}

/// Shortened mint used as a stand-in symbol for unrecognised tokens.
fn short_mint(mint: &str) -> String {
    if mint.len() <= 8 {
        mint.to_string()
    } else {
        format!("{}..{}", &mint[..4], &mint[mint.len() - 4..])
    }
}

/// Parse holdings out of a `getTokenAccountsByOwner` result (jsonParsed
/// encoding). Empty and unreadable accounts are dropped.
fn parse_token_accounts(result: &serde_json::Value) -> Vec<TokenHolding> {
    let mut holdings = Vec::new();
    let Some(accounts) = result["value"].as_array() else {
        return holdings;
    };

    for account in accounts {
        let info = &account["account"]["data"]["parsed"]["info"];
        let Some(mint) = info["mint"].as_str() else {
            continue;
        };
        let amount = &info["tokenAmount"];
        let balance = amount["uiAmount"].as_f64().unwrap_or(0.0);
        if balance <= 0.0 {
            continue;
        }
        let decimals = amount["decimals"].as_u64().unwrap_or(0) as u8;

        let (symbol, name) = match known_token(mint) {
            Some((symbol, name)) => (symbol.to_string(), name.to_string()),
            None => (short_mint(mint), "Unknown token".to_string()),
        };
        holdings.push(TokenHolding::token(mint, symbol, name, balance, decimals));
    }

    holdings
}

// === Inspector tests ===

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn token_account(mint: &str, ui_amount: f64, decimals: u64) -> serde_json::Value {
        json!({
            "pubkey": "AccountPubkey11111111111111111111111111111",
            "account": {
                "data": {
                    "parsed": {
                        "info": {
                            "mint": mint,
                            "owner": "Owner",
                            "tokenAmount": {
                                "amount": "1",
                                "decimals": decimals,
                                "uiAmount": ui_amount,
                                "uiAmountString": ui_amount.to_string(),
                            }
                        },
                        "type": "account"
                    },
                    "program": "spl-token",
                }
            }
        })
    }

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_000_000_000), 1.0);
        assert_eq!(lamports_to_sol(500_000_000), 0.5);
        assert_eq!(lamports_to_sol(0), 0.0);
    }

    #[test]
    fn test_parse_token_accounts() {
        let result = json!({ "value": [token_account(USDC_MINT, 123.45, 6)] });
        let holdings = parse_token_accounts(&result);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "USDC");
        assert_eq!(holdings[0].name, "USD Coin");
        assert_eq!(holdings[0].balance, 123.45);
        assert_eq!(holdings[0].decimals, 6);
    }

    #[test]
    fn test_parse_token_accounts_skips_empty_balances() {
        let result = json!({ "value": [token_account(USDC_MINT, 0.0, 6)] });
        assert!(parse_token_accounts(&result).is_empty());
    }

    #[test]
    fn test_parse_token_accounts_unknown_mint_gets_short_symbol() {
        let mint = "DUSTawucrTsGU8hcqRdHDCbuYhCPADMLM2VcCb8VnFnQ";
        let result = json!({ "value": [token_account(mint, 5.0, 9)] });
        let holdings = parse_token_accounts(&result);
        assert_eq!(holdings[0].symbol, "DUST..nFnQ");
        assert_eq!(holdings[0].name, "Unknown token");
    }

    #[test]
    fn test_parse_token_accounts_missing_value() {
        let result = json!({});
        assert!(parse_token_accounts(&result).is_empty());
    }

    #[test]
    fn test_short_mint() {
        assert_eq!(short_mint("SHORT"), "SHORT");
        assert_eq!(
            short_mint("DUSTawucrTsGU8hcqRdHDCbuYhCPADMLM2VcCb8VnFnQ"),
            "DUST..nFnQ"
        );
    }
}

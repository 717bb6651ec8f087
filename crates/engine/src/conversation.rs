//! Conversation state machine: wallet -> token -> threshold -> request.
//!
//! Only two things mutate state here: valid input advances the phase, and
//! a completed flow deletes it. Invalid input replies and leaves the stored
//! state exactly as it was.

use chrono::Utc;
use solwatch_core::{
    AlertRequest, ConversationState, Destination, Phase, TokenHolding, UserId, WalletAddress,
};
use solwatch_feeds::WalletInspector;
use solwatch_store::{AlertStore, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Engine errors. Feed problems are absorbed into replies; only the store
/// can fail a turn outright.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// What the engine wants said back, plus the completed request when the
/// flow just finished.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReply {
    pub text: String,
    /// Symbols to offer as quick-pick buttons while a token choice is pending.
    pub offer_tokens: Vec<String>,
    pub request: Option<AlertRequest>,
}

impl EngineReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offer_tokens: Vec::new(),
            request: None,
        }
    }
}

pub struct ConversationEngine {
    inspector: Arc<dyn WalletInspector>,
    store: Arc<dyn AlertStore>,
}

impl ConversationEngine {
    pub fn new(inspector: Arc<dyn WalletInspector>, store: Arc<dyn AlertStore>) -> Self {
        Self { inspector, store }
    }

    /// Advance one user's state machine with one line of input.
    pub async fn handle_text(
        &self,
        user_id: UserId,
        destination: Destination,
        text: &str,
    ) -> Result<EngineReply, EngineError> {
        let input = text.trim();
        match self.store.get_user(user_id).await? {
            None => self.register_wallet(user_id, destination, input).await,
            Some(state) => match state.phase.clone() {
                Phase::AwaitingToken => self.choose_token(user_id, state, input).await,
                Phase::AwaitingThreshold { selected } => {
                    self.set_threshold(user_id, state, selected, input).await
                }
            },
        }
    }

    async fn register_wallet(
        &self,
        user_id: UserId,
        destination: Destination,
        input: &str,
    ) -> Result<EngineReply, EngineError> {
        let wallet = match WalletAddress::parse(input) {
            Ok(wallet) => wallet,
            Err(e) => {
                debug!(user = user_id.0, "rejected wallet address: {}", e);
                return Ok(EngineReply::text(
                    "That doesn't look like a valid Solana wallet address. \
                     Please check it and try again.",
                ));
            }
        };

        let holdings = match self.inspector.holdings(&wallet).await {
            Ok(holdings) => holdings,
            Err(e) => {
                warn!(user = user_id.0, "wallet inspection failed: {}", e);
                return Ok(EngineReply::text(
                    "Something went wrong while reading that wallet. \
                     Please try again in a moment.",
                ));
            }
        };

        if holdings.is_empty() {
            return Ok(EngineReply::text("No tokens found in that wallet."));
        }

        let state = ConversationState::new(wallet, holdings.clone(), destination);
        self.store.put_user(user_id, &state).await?;

        Ok(EngineReply {
            text: format!(
                "Found these tokens in your wallet:\n{}\n\nSend a token symbol to set up a price alert.",
                render_holdings(&holdings)
            ),
            offer_tokens: holdings.iter().map(|h| h.symbol.to_string()).collect(),
            request: None,
        })
    }

    async fn choose_token(
        &self,
        user_id: UserId,
        mut state: ConversationState,
        input: &str,
    ) -> Result<EngineReply, EngineError> {
        let Some(selected) = state.find_holding(input).cloned() else {
            return Ok(EngineReply {
                text: "Token not found. Pick one of the symbols from your wallet.".to_string(),
                offer_tokens: state.holdings.iter().map(|h| h.symbol.to_string()).collect(),
                request: None,
            });
        };

        state.select(selected.clone());
        self.store.put_user(user_id, &state).await?;

        Ok(EngineReply::text(format!(
            "Tracking {}. What percentage change should trigger the alert? (e.g. 5 for 5%)",
            selected.symbol
        )))
    }

    async fn set_threshold(
        &self,
        user_id: UserId,
        state: ConversationState,
        selected: TokenHolding,
        input: &str,
    ) -> Result<EngineReply, EngineError> {
        let threshold = input
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0);

        let Some(threshold_percent) = threshold else {
            return Ok(EngineReply::text(
                "Please enter a positive number for the percentage (e.g. 5 for 5%).",
            ));
        };

        // The flow is complete; state is consumed before the request is
        // handed off for arming.
        self.store.delete_user(user_id).await?;

        Ok(EngineReply {
            text: String::new(),
            offer_tokens: Vec::new(),
            request: Some(AlertRequest {
                user_id,
                token: selected,
                threshold_percent,
                destination: state.destination,
            }),
        })
    }

    /// Drop conversations idle for longer than `ttl`.
    pub async fn reap_stale(&self, ttl: chrono::Duration) -> Result<u64, EngineError> {
        let cutoff = Utc::now() - ttl;
        let removed = self.store.purge_stale_users(cutoff).await?;
        if removed > 0 {
            debug!(removed, "reaped stale conversations");
        }
        Ok(removed)
    }
}

/// One line per holding, in snapshot order (native coin first).
fn render_holdings(holdings: &[TokenHolding]) -> String {
    holdings
        .iter()
        .map(|h| format!("• {}: {}", h.symbol, h.balance))
        .collect::<Vec<_>>()
        .join("\n")
}

// === Conversation engine tests ===

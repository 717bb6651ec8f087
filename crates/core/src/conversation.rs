//! Per-user conversation state for the wallet -> token -> threshold flow.

use crate::{Destination, TokenHolding, WalletAddress};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Where the user is in the flow. Idle users have no stored state at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    /// Wallet registered; waiting for a token symbol.
    AwaitingToken,
    /// Token chosen; waiting for a threshold percentage.
    AwaitingThreshold { selected: TokenHolding },
}

/// One user's in-progress alert setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub wallet: WalletAddress,
    /// Holdings snapshot from registration time; not refreshed mid-flow.
    pub holdings: Vec<TokenHolding>,
    pub destination: Destination,
    pub phase: Phase,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(wallet: WalletAddress, holdings: Vec<TokenHolding>, destination: Destination) -> Self {
        Self {
            wallet,
            holdings,
            destination,
            phase: Phase::AwaitingToken,
            updated_at: Utc::now(),
        }
    }

    /// Case-insensitive exact match against the snapshot.
    pub fn find_holding(&self, symbol: &str) -> Option<&TokenHolding> {
        self.holdings.iter().find(|h| h.matches_symbol(symbol))
    }

    /// Advance to the threshold phase with the chosen token.
    pub fn select(&mut self, holding: TokenHolding) {
        self.phase = Phase::AwaitingThreshold { selected: holding };
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        Utc::now() - self.updated_at > ttl
    }
}

// === Conversation state tests ===

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state() -> ConversationState {
        let wallet = WalletAddress::parse("11111111111111111111111111111111").unwrap();
        let holdings = vec![
            TokenHolding::native(1.0),
            TokenHolding::token(
                "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "USDC",
                "USD Coin",
                50.0,
                6,
            ),
        ];
        ConversationState::new(wallet, holdings, Destination(7))
    }

    #[test]
    fn test_new_starts_awaiting_token() {
        let s = state();
        assert_eq!(s.phase, Phase::AwaitingToken);
    }

    #[test]
    fn test_find_holding_case_insensitive() {
        let s = state();
        assert_eq!(s.find_holding("usdc").unwrap().symbol, "USDC");
        assert_eq!(s.find_holding("SOL").unwrap().symbol, "SOL");
        assert!(s.find_holding("BONK").is_none());
    }

    #[test]
    fn test_select_moves_to_threshold_phase() {
        let mut s = state();
        let usdc = s.find_holding("USDC").unwrap().clone();
        s.select(usdc.clone());
        assert_eq!(s.phase, Phase::AwaitingThreshold { selected: usdc });
    }

    #[test]
    fn test_staleness() {
        let mut s = state();
        assert!(!s.is_stale(Duration::seconds(60)));
        s.updated_at = Utc::now() - Duration::seconds(120);
        assert!(s.is_stale(Duration::seconds(60)));
    }

    #[test]
    fn test_state_serde_round_trip() {
        let s = state();
        let json = serde_json::to_string(&s).unwrap();
        let parsed: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s);
    }
}

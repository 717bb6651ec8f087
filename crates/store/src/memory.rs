//! Volatile in-memory store.
//!
//! Everything is lost on restart; suitable for tests and throwaway
//! deployments.

use crate::{AlertStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use solwatch_core::{Alert, AlertKey, ConversationState, UserId};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<UserId, ConversationState>,
    alerts: DashMap<AlertKey, Alert>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_age(mut alerts: Vec<Alert>) -> Vec<Alert> {
    alerts.sort_by_key(|a| a.created_at);
    alerts
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn put_user(&self, user_id: UserId, state: &ConversationState) -> Result<(), StoreError> {
        self.users.insert(user_id, state.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.users.get(&user_id).map(|entry| entry.clone()))
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), StoreError> {
        self.users.remove(&user_id);
        Ok(())
    }

    async fn purge_stale_users(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut removed = 0u64;
        self.users.retain(|_, state| {
            let keep = state.updated_at >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn put_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts.insert(alert.key(), alert.clone());
        Ok(())
    }

    async fn get_alert(&self, key: &AlertKey) -> Result<Option<Alert>, StoreError> {
        Ok(self.alerts.get(key).map(|entry| entry.clone()))
    }

    async fn delete_alert(&self, key: &AlertKey) -> Result<(), StoreError> {
        self.alerts.remove(key);
        Ok(())
    }

    async fn list_alerts_by_user(&self, user_id: UserId) -> Result<Vec<Alert>, StoreError> {
        let alerts = self
            .alerts
            .iter()
            .filter(|entry| entry.key().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(sorted_by_age(alerts))
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let alerts = self.alerts.iter().map(|entry| entry.value().clone()).collect();
        Ok(sorted_by_age(alerts))
    }

    async fn clear_alerts_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut removed = 0u64;
        self.alerts.retain(|key, _| {
            let keep = key.user_id != user_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

// === MemoryStore tests ===

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use solwatch_core::{Destination, TokenHolding, WalletAddress};

    fn conversation() -> ConversationState {
        let wallet = WalletAddress::parse("11111111111111111111111111111111").unwrap();
        ConversationState::new(wallet, vec![TokenHolding::native(1.0)], Destination(1))
    }

    fn alert(user: i64, holding: TokenHolding) -> Alert {
        Alert {
            user_id: UserId(user),
            token: holding,
            threshold_percent: 5.0,
            baseline_value: 100.0,
            destination: Destination(user),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let store = MemoryStore::new();
        let state = conversation();

        store.put_user(UserId(1), &state).await.unwrap();
        assert_eq!(store.get_user(UserId(1)).await.unwrap(), Some(state));

        store.delete_user(UserId(1)).await.unwrap();
        assert_eq!(store.get_user(UserId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_absent_user_is_noop() {
        let store = MemoryStore::new();
        store.delete_user(UserId(99)).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_stale_users() {
        let store = MemoryStore::new();
        let fresh = conversation();
        let mut stale = conversation();
        stale.updated_at = Utc::now() - Duration::hours(1);

        store.put_user(UserId(1), &fresh).await.unwrap();
        store.put_user(UserId(2), &stale).await.unwrap();

        let cutoff = Utc::now() - Duration::minutes(15);
        let removed = store.purge_stale_users(cutoff).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_user(UserId(1)).await.unwrap().is_some());
        assert!(store.get_user(UserId(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_alert_upserts_per_key() {
        let store = MemoryStore::new();
        let first = alert(1, TokenHolding::native(1.0));
        let mut second = alert(1, TokenHolding::native(1.0));
        second.threshold_percent = 10.0;

        store.put_alert(&first).await.unwrap();
        store.put_alert(&second).await.unwrap();

        let alerts = store.list_alerts_by_user(UserId(1)).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].threshold_percent, 10.0);
    }

    #[tokio::test]
    async fn test_list_alerts_by_user_oldest_first() {
        let store = MemoryStore::new();
        let usdc = TokenHolding::token(
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "USDC",
            "USD Coin",
            10.0,
            6,
        );
        let mut older = alert(1, TokenHolding::native(1.0));
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = alert(1, usdc);
        let other_user = alert(2, TokenHolding::native(3.0));

        store.put_alert(&newer).await.unwrap();
        store.put_alert(&older).await.unwrap();
        store.put_alert(&other_user).await.unwrap();

        let alerts = store.list_alerts_by_user(UserId(1)).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].token.symbol, "SOL");
        assert_eq!(alerts[1].token.symbol, "USDC");
    }

    #[tokio::test]
    async fn test_clear_alerts_for_user() {
        let store = MemoryStore::new();
        store.put_alert(&alert(1, TokenHolding::native(1.0))).await.unwrap();
        store.put_alert(&alert(2, TokenHolding::native(1.0))).await.unwrap();

        let removed = store.clear_alerts_for_user(UserId(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.list_alerts_by_user(UserId(1)).await.unwrap().is_empty());
        assert_eq!(store.list_alerts().await.unwrap().len(), 1);
    }
}

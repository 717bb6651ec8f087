//! Conversation and alert persistence.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solwatch_core::{Alert, AlertKey, ConversationState, UserId};
use thiserror::Error;

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Persistence seam for conversation state and armed alerts.
///
/// Every operation is idempotent. `MemoryStore` is volatile; `SqliteStore`
/// survives a process restart.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Upsert one user's conversation state.
    async fn put_user(&self, user_id: UserId, state: &ConversationState) -> Result<(), StoreError>;
    async fn get_user(&self, user_id: UserId) -> Result<Option<ConversationState>, StoreError>;
    /// Deleting an absent user is a no-op.
    async fn delete_user(&self, user_id: UserId) -> Result<(), StoreError>;
    /// Delete conversation state not touched since `cutoff`. Returns the
    /// number of rows removed.
    async fn purge_stale_users(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Upsert: a new alert for an existing (user, token) pair replaces the
    /// old one.
    async fn put_alert(&self, alert: &Alert) -> Result<(), StoreError>;
    async fn get_alert(&self, key: &AlertKey) -> Result<Option<Alert>, StoreError>;
    /// Deleting an absent alert is a no-op.
    async fn delete_alert(&self, key: &AlertKey) -> Result<(), StoreError>;
    /// One user's alerts, oldest first.
    async fn list_alerts_by_user(&self, user_id: UserId) -> Result<Vec<Alert>, StoreError>;
    /// Every stored alert, for rehydration after a restart.
    async fn list_alerts(&self) -> Result<Vec<Alert>, StoreError>;
    /// Delete all of a user's alerts. Returns the number removed.
    async fn clear_alerts_for_user(&self, user_id: UserId) -> Result<u64, StoreError>;
}

//! Durable sqlite-backed store.
//!
//! Records are stored as JSON columns keyed by user and token, with unix
//! timestamps alongside for purging and ordering.

use crate::{AlertStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solwatch_core::{Alert, AlertKey, ConversationState, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) and migrate the database.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Connected to database: {}", database_url);
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                user_id INTEGER PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                user_id INTEGER NOT NULL,
                token_id TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(user_id, token_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alerts_user ON alerts(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn decode_alerts(rows: Vec<String>) -> Result<Vec<Alert>, StoreError> {
    rows.iter()
        .map(|raw| serde_json::from_str(raw).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl AlertStore for SqliteStore {
    async fn put_user(&self, user_id: UserId, state: &ConversationState) -> Result<(), StoreError> {
        let record = serde_json::to_string(state)?;
        sqlx::query(
            r#"
            INSERT INTO conversations (user_id, state, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id.0)
        .bind(record)
        .bind(state.updated_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<ConversationState>, StoreError> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT state FROM conversations WHERE user_id = ?")
                .bind(user_id.0)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM conversations WHERE user_id = ?")
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_stale_users(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM conversations WHERE updated_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn put_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let record = serde_json::to_string(alert)?;
        sqlx::query(
            r#"
            INSERT INTO alerts (user_id, token_id, record, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, token_id) DO UPDATE SET
                record = excluded.record,
                created_at = excluded.created_at
            "#,
        )
        .bind(alert.user_id.0)
        .bind(alert.token.id.as_str())
        .bind(record)
        .bind(alert.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_alert(&self, key: &AlertKey) -> Result<Option<Alert>, StoreError> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT record FROM alerts WHERE user_id = ? AND token_id = ?")
                .bind(key.user_id.0)
                .bind(key.token_id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete_alert(&self, key: &AlertKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM alerts WHERE user_id = ? AND token_id = ?")
            .bind(key.user_id.0)
            .bind(key.token_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_alerts_by_user(&self, user_id: UserId) -> Result<Vec<Alert>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT record FROM alerts WHERE user_id = ? ORDER BY created_at, rowid",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        decode_alerts(rows)
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT record FROM alerts ORDER BY created_at, rowid")
                .fetch_all(&self.pool)
                .await?;
        decode_alerts(rows)
    }

    async fn clear_alerts_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM alerts WHERE user_id = ?")
            .bind(user_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// === SqliteStore tests ===

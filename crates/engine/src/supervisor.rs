//! Alert arming and the periodic evaluation loop.

use crate::sink::NotificationSink;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use solwatch_core::{Alert, AlertKey, AlertRequest, RearmPolicy, UserId};
use solwatch_feeds::{FeedError, PriceOracle};
use solwatch_store::{AlertStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Supervisor errors, surfaced to the user when arming fails.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    #[error("no price available for {0}")]
    PriceUnavailable(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("price feed error: {0}")]
    Feed(#[from] FeedError),
}

/// Owns the set of active alerts and decides when they fire.
///
/// Each active key has at most one evaluation running at a time; a tick that
/// lands while the previous evaluation is still in flight skips that key
/// rather than queueing behind it.
pub struct AlertSupervisor {
    oracle: Arc<dyn PriceOracle>,
    store: Arc<dyn AlertStore>,
    sink: Arc<dyn NotificationSink>,
    policy: RearmPolicy,
    active: DashMap<AlertKey, Alert>,
    in_flight: DashMap<AlertKey, ()>,
}

impl AlertSupervisor {
    pub fn new(
        oracle: Arc<dyn PriceOracle>,
        store: Arc<dyn AlertStore>,
        sink: Arc<dyn NotificationSink>,
        policy: RearmPolicy,
    ) -> Self {
        Self {
            oracle,
            store,
            sink,
            policy,
            active: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Compute the baseline and activate the alert.
    ///
    /// Persists before scheduling: if the store write fails, nothing is
    /// armed and no evaluation will ever run for the request.
    pub async fn arm(&self, request: AlertRequest) -> Result<Alert, SupervisorError> {
        let price = self.oracle.price_usd(&request.token.id).await?;
        let Some(price) = price else {
            return Err(SupervisorError::PriceUnavailable(
                request.token.symbol.to_string(),
            ));
        };

        let baseline = price * request.token.balance;
        let alert = Alert::from_request(&request, baseline);
        self.store.put_alert(&alert).await?;

        // Replaces any prior alert for this (user, token) pair.
        self.active.insert(alert.key(), alert.clone());
        info!(
            user = alert.user_id.0,
            token = %alert.token.id,
            baseline = alert.baseline_value,
            "alert armed"
        );
        Ok(alert)
    }

    /// One polling pass: spawn an evaluation for every active alert whose
    /// previous evaluation has finished.
    pub fn tick(self: &Arc<Self>) {
        let keys: Vec<AlertKey> = self.active.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            match self.in_flight.entry(key.clone()) {
                Entry::Occupied(_) => {
                    debug!(
                        user = key.user_id.0,
                        token = %key.token_id,
                        "evaluation still running, skipping this cycle"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(());
                    let supervisor = Arc::clone(self);
                    tokio::spawn(async move {
                        supervisor.evaluate(&key).await;
                        supervisor.in_flight.remove(&key);
                    });
                }
            }
        }
    }

    /// Evaluate one alert: fetch the price, compare against the baseline,
    /// deliver and apply the rearm policy on a breach.
    async fn evaluate(&self, key: &AlertKey) {
        let Some(alert) = self.active.get(key).map(|entry| entry.clone()) else {
            return;
        };

        let price = match self.oracle.price_usd(&alert.token.id).await {
            Ok(Some(price)) => price,
            Ok(None) => {
                debug!(token = %alert.token.id, "no price this cycle, skipping");
                return;
            }
            Err(e) => {
                debug!(token = %alert.token.id, "price fetch failed, skipping: {}", e);
                return;
            }
        };

        let current_value = price * alert.token.balance;
        let change = alert.percent_change(current_value);
        if !alert.breaches(change) {
            return;
        }

        // The alert may have been cleared or replaced while the price was in
        // flight. A deleted key must not notify, and a stale evaluation must
        // not write over a replacement record.
        match self.store.get_alert(key).await {
            Ok(Some(stored)) if stored == alert => {}
            Ok(Some(_)) => {
                debug!(
                    user = key.user_id.0,
                    token = %key.token_id,
                    "alert replaced mid-evaluation, dropping cycle"
                );
                return;
            }
            Ok(None) => {
                debug!(
                    user = key.user_id.0,
                    token = %key.token_id,
                    "alert cleared mid-evaluation, dropping notification"
                );
                self.active.remove(key);
                return;
            }
            Err(e) => {
                warn!("store check failed, skipping this cycle: {}", e);
                return;
            }
        }

        let message = format_fired_message(&alert, change, price, current_value);
        if let Err(e) = self.sink.send(alert.destination, &message).await {
            error!(user = alert.user_id.0, "failed to deliver alert: {}", e);
        }

        match self.policy {
            RearmPolicy::Rearm => {
                let mut rearmed = alert.clone();
                rearmed.baseline_value = current_value;
                if let Err(e) = self.store.put_alert(&rearmed).await {
                    warn!("failed to persist rearmed baseline: {}", e);
                }
                if let Some(mut entry) = self.active.get_mut(key) {
                    if *entry == alert {
                        entry.baseline_value = current_value;
                    }
                }
            }
            RearmPolicy::FireOnce => {
                self.active.remove(key);
                if let Err(e) = self.store.delete_alert(key).await {
                    warn!("failed to delete fired alert: {}", e);
                }
            }
        }

        info!(
            user = alert.user_id.0,
            token = %alert.token.id,
            "alert fired: {:+.2}%",
            change
        );
    }

    /// Cancel and delete every alert owned by the user. Returns how many
    /// were persisted.
    pub async fn clear_all(&self, user_id: UserId) -> Result<u64, SupervisorError> {
        let removed = self.store.clear_alerts_for_user(user_id).await?;
        self.active.retain(|key, _| key.user_id != user_id);
        Ok(removed)
    }

    /// Active alerts for a user, oldest first.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Alert>, SupervisorError> {
        Ok(self.store.list_alerts_by_user(user_id).await?)
    }

    /// Reload persisted alerts into the active registry after a restart.
    /// Baselines are kept as recorded, not recomputed.
    pub async fn rehydrate(&self) -> Result<usize, SupervisorError> {
        let alerts = self.store.list_alerts().await?;
        let count = alerts.len();
        for alert in alerts {
            self.active.insert(alert.key(), alert);
        }
        Ok(count)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Fixed-interval polling loop. Runs until the task is dropped.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        info!(secs = interval.as_secs(), "starting alert evaluation loop");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}

/// Format a USD amount with precision scaled to its magnitude.
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1000.0 {
        format!("${:.2}", value)
    } else if abs >= 1.0 {
        format!("${:.4}", value)
    } else if abs >= 0.01 {
        format!("${:.6}", value)
    } else {
        format!("${:.8}", value)
    }
}

fn format_fired_message(alert: &Alert, change: f64, price: f64, current_value: f64) -> String {
    format!(
        "🚨 <b>{} moved {:+.2}%</b>\n\n\
         Price: {}\n\
         Position value: {} (was {})",
        alert.token.symbol,
        change,
        format_usd(price),
        format_usd(current_value),
        format_usd(alert.baseline_value),
    )
}

// === Supervisor tests ===

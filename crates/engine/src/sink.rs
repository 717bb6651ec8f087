//! Notification delivery seam.

use async_trait::async_trait;
use solwatch_core::Destination;
use thiserror::Error;

/// Delivery errors. Logged by callers, never retried.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Fire-and-forget delivery of a formatted message. A failed send never
/// feeds back into the alert lifecycle.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, destination: Destination, message: &str) -> Result<(), SinkError>;
}

//! Telegram delivery for fired alerts.

use async_trait::async_trait;
use solwatch_core::Destination;
use solwatch_engine::{NotificationSink, SinkError};
use teloxide::prelude::*;
use teloxide::types::ParseMode;

/// Sends fired-alert messages to the chat the alert was armed from.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, destination: Destination, message: &str) -> Result<(), SinkError> {
        self.bot
            .send_message(ChatId(destination.0), message)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| SinkError::Delivery(e.to_string()))?;
        Ok(())
    }
}

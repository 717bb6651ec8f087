//! Telegram bot handlers.

use solwatch_core::{Destination, UserId};
use solwatch_engine::{format_usd, AlertSupervisor, ConversationEngine, SupervisorError};
use std::sync::Arc;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::error;

const WELCOME: &str = "Welcome to Solwatch!\n\n\
    Send me your Solana wallet address and I'll list what it holds. \
    Pick a token, set a percentage, and I'll message you when its value \
    moves by that much.\n\n\
    Use /help to see available commands.";

const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Register a wallet and start setting up alerts")]
    Start,
    #[command(description = "Show the menu")]
    Menu,
    #[command(description = "List your active alerts")]
    Alerts,
    #[command(description = "Remove all your alerts")]
    Clear,
    #[command(description = "Show help")]
    Help,
}

/// Telegram bot wrapper.
pub struct WalletBot {
    bot: Bot,
    engine: Arc<ConversationEngine>,
    supervisor: Arc<AlertSupervisor>,
}

impl WalletBot {
    pub fn new(bot: Bot, engine: Arc<ConversationEngine>, supervisor: Arc<AlertSupervisor>) -> Self {
        Self {
            bot,
            engine,
            supervisor,
        }
    }

    /// Run the update dispatcher until shutdown.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();

        let commands = {
            let this = Arc::clone(&self);
            Update::filter_message().filter_command::<Command>().endpoint(
                move |bot: Bot, msg: Message, cmd: Command| {
                    let this = Arc::clone(&this);
                    async move { this.handle_command(bot, msg, cmd).await }
                },
            )
        };

        let callbacks = {
            let this = Arc::clone(&self);
            Update::filter_callback_query().endpoint(move |bot: Bot, query: CallbackQuery| {
                let this = Arc::clone(&this);
                async move { this.handle_callback(bot, query).await }
            })
        };

        let messages = {
            let this = Arc::clone(&self);
            Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let this = Arc::clone(&this);
                async move { this.handle_message(bot, msg).await }
            })
        };

        let handler = dptree::entry()
            .branch(commands)
            .branch(callbacks)
            .branch(messages);

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        match cmd {
            Command::Start => {
                bot.send_message(msg.chat.id, WELCOME).await?;
            }
            Command::Menu => {
                bot.send_message(msg.chat.id, "What would you like to do?")
                    .reply_markup(main_menu())
                    .await?;
            }
            Command::Alerts => self.send_alert_list(&bot, msg.chat.id).await?,
            Command::Clear => self.clear_alerts(&bot, msg.chat.id).await?,
            Command::Help => {
                bot.send_message(msg.chat.id, Command::descriptions().to_string())
                    .await?;
            }
        }
        Ok(())
    }

    /// Any non-command message feeds the conversation flow.
    async fn handle_message(&self, bot: Bot, msg: Message) -> Result<(), TelegramError> {
        let Some(text) = msg.text() else {
            return Ok(());
        };
        self.drive_conversation(&bot, msg.chat.id, text).await
    }

    /// Inline button presses feed the same flow as typed input.
    async fn handle_callback(&self, bot: Bot, query: CallbackQuery) -> Result<(), TelegramError> {
        bot.answer_callback_query(query.id.clone()).await?;

        let Some(data) = query.data else {
            return Ok(());
        };
        let Some(chat_id) = callback_chat_id(query.from.id.0) else {
            error!("callback from out-of-range user id {}", query.from.id);
            return Ok(());
        };

        match data.as_str() {
            "menu:alerts" => self.send_alert_list(&bot, chat_id).await,
            "menu:clear" => self.clear_alerts(&bot, chat_id).await,
            _ => match data.strip_prefix("token:") {
                Some(symbol) => self.drive_conversation(&bot, chat_id, symbol).await,
                None => Ok(()),
            },
        }
    }

    /// Feed one line of input through the engine and act on the outcome.
    async fn drive_conversation(
        &self,
        bot: &Bot,
        chat_id: ChatId,
        text: &str,
    ) -> Result<(), TelegramError> {
        let user_id = UserId(chat_id.0);
        let destination = Destination(chat_id.0);

        let reply = match self.engine.handle_text(user_id, destination, text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user = chat_id.0, "conversation handling failed: {}", e);
                bot.send_message(chat_id, GENERIC_ERROR).await?;
                return Ok(());
            }
        };

        // A completed flow hands over an arm request; everything else is a
        // plain reply, optionally with quick-pick buttons.
        if let Some(request) = reply.request {
            let symbol = request.token.symbol.clone();
            let threshold = request.threshold_percent;
            match self.supervisor.arm(request).await {
                Ok(_) => {
                    bot.send_message(
                        chat_id,
                        format!("✅ Alert set for {} at {}% change!", symbol, threshold),
                    )
                    .await?;
                }
                Err(SupervisorError::PriceUnavailable(_)) => {
                    bot.send_message(
                        chat_id,
                        format!(
                            "No price is available for {} right now, so the alert was \
                             not set. Please try again later.",
                            symbol
                        ),
                    )
                    .await?;
                }
                Err(e) => {
                    error!(user = chat_id.0, "failed to arm alert: {}", e);
                    bot.send_message(chat_id, GENERIC_ERROR).await?;
                }
            }
            return Ok(());
        }

        let mut send = bot.send_message(chat_id, reply.text);
        if !reply.offer_tokens.is_empty() {
            send = send.reply_markup(token_keyboard(&reply.offer_tokens));
        }
        send.await?;
        Ok(())
    }

    async fn send_alert_list(&self, bot: &Bot, chat_id: ChatId) -> Result<(), TelegramError> {
        match self.supervisor.list(UserId(chat_id.0)).await {
            Ok(alerts) if alerts.is_empty() => {
                bot.send_message(
                    chat_id,
                    "You have no active alerts. Send a wallet address to create one.",
                )
                .await?;
            }
            Ok(alerts) => {
                let mut text = format!("<b>Active alerts ({})</b>\n\n", alerts.len());
                for alert in &alerts {
                    text.push_str(&format!(
                        "• {} — fires at ±{}% (baseline {})\n",
                        alert.token.symbol,
                        alert.threshold_percent,
                        format_usd(alert.baseline_value)
                    ));
                }
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            Err(e) => {
                error!(user = chat_id.0, "failed to list alerts: {}", e);
                bot.send_message(chat_id, GENERIC_ERROR).await?;
            }
        }
        Ok(())
    }

    async fn clear_alerts(&self, bot: &Bot, chat_id: ChatId) -> Result<(), TelegramError> {
        match self.supervisor.clear_all(UserId(chat_id.0)).await {
            Ok(0) => {
                bot.send_message(chat_id, "You have no alerts to remove.")
                    .await?;
            }
            Ok(removed) => {
                bot.send_message(chat_id, format!("Removed {} alert(s).", removed))
                    .await?;
            }
            Err(e) => {
                error!(user = chat_id.0, "failed to clear alerts: {}", e);
                bot.send_message(chat_id, GENERIC_ERROR).await?;
            }
        }
        Ok(())
    }
}

/// Alerts are private-chat only, so the sender's user id doubles as the
/// chat id, provided it fits.
fn callback_chat_id(raw: u64) -> Option<ChatId> {
    i64::try_from(raw).ok().map(ChatId)
}

/// Inline keyboard of held-token symbols, three per row.
fn token_keyboard(symbols: &[String]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = symbols
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|symbol| {
                    InlineKeyboardButton::callback(symbol.clone(), format!("token:{symbol}"))
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📋 My alerts", "menu:alerts")],
        vec![InlineKeyboardButton::callback("🗑 Clear alerts", "menu:clear")],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_keyboard_chunks_rows() {
        let symbols: Vec<String> = ["SOL", "USDC", "BONK", "JUP"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let keyboard = token_keyboard(&symbols);
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 3);
        assert_eq!(keyboard.inline_keyboard[1].len(), 1);
    }

    #[test]
    fn test_main_menu_rows() {
        let keyboard = main_menu();
        assert_eq!(keyboard.inline_keyboard.len(), 2);
    }

    #[test]
    fn test_callback_chat_id_bounds() {
        assert_eq!(callback_chat_id(42), Some(ChatId(42)));
        assert_eq!(callback_chat_id(i64::MAX as u64), Some(ChatId(i64::MAX)));
        assert_eq!(callback_chat_id(u64::MAX), None);
    }
}

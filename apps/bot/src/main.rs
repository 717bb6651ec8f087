//! Solwatch - Solana wallet price-alert Telegram bot.
//!
//! Register a wallet, pick a held token, set a percentage threshold, and get
//! a message when the position's value moves by that much.

mod config;
mod sink;
mod telegram;

use clap::Parser;
use config::{AppConfig, StoreBackend};
use sink::TelegramSink;
use solwatch_core::RearmPolicy;
use solwatch_engine::{AlertSupervisor, ConversationEngine, NotificationSink};
use solwatch_feeds::{JupiterOracle, PriceOracle, RpcWalletInspector, WalletInspector};
use solwatch_store::{AlertStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use telegram::WalletBot;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Solwatch CLI
#[derive(Parser, Debug)]
#[command(name = "solwatch")]
#[command(about = "Solana wallet price-alert Telegram bot", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Store backend: memory, sqlite
    #[arg(long)]
    store: Option<String>,

    /// Alert polling interval in seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// What happens after an alert fires: rearm, fire-once
    #[arg(long)]
    rearm_policy: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn parse_policy(policy: &str) -> RearmPolicy {
    match policy.to_lowercase().as_str() {
        "fire-once" | "fireonce" | "once" => RearmPolicy::FireOnce,
        _ => RearmPolicy::Rearm,
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = AppConfig::load(&args.config);
    if let Some(store) = &args.store {
        config.store.backend = StoreBackend::parse(store);
    }
    if let Some(secs) = args.poll_interval {
        config.supervisor.poll_interval_secs = secs;
    }
    if let Some(policy) = &args.rearm_policy {
        config.supervisor.rearm_policy = parse_policy(policy);
    }

    let token = match std::env::var("TELEGRAM_BOT_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => {
            error!("TELEGRAM_BOT_TOKEN is not set");
            return;
        }
    };

    info!("🚀 Solwatch starting...");
    info!("  Store: {:?}", config.store.backend);
    info!("  Poll interval: {}s", config.supervisor.poll_interval_secs);
    info!("  Rearm policy: {:?}", config.supervisor.rearm_policy);

    let store: Arc<dyn AlertStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Sqlite => match SqliteStore::connect(&config.store.database_url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to open store: {}", e);
                return;
            }
        },
    };

    let oracle: Arc<dyn PriceOracle> = match JupiterOracle::new(&config.feeds.price_api_url) {
        Ok(oracle) => Arc::new(oracle),
        Err(e) => {
            error!("Failed to build price client: {}", e);
            return;
        }
    };
    let inspector: Arc<dyn WalletInspector> =
        match RpcWalletInspector::new(&config.feeds.rpc_endpoint) {
            Ok(inspector) => Arc::new(inspector),
            Err(e) => {
                error!("Failed to build RPC client: {}", e);
                return;
            }
        };

    let bot = teloxide::Bot::new(&token);
    let notifier: Arc<dyn NotificationSink> = Arc::new(TelegramSink::new(bot.clone()));

    let supervisor = Arc::new(AlertSupervisor::new(
        oracle,
        Arc::clone(&store),
        notifier,
        config.supervisor.rearm_policy,
    ));
    match supervisor.rehydrate().await {
        Ok(0) => {}
        Ok(count) => info!("Rehydrated {} alert(s) from the store", count),
        Err(e) => warn!("Failed to rehydrate alerts: {}", e),
    }

    let engine = Arc::new(ConversationEngine::new(inspector, Arc::clone(&store)));

    // Evaluation loop
    let poll = Duration::from_secs(config.supervisor.poll_interval_secs);
    let loop_supervisor = Arc::clone(&supervisor);
    tokio::spawn(async move {
        loop_supervisor.run(poll).await;
    });

    // Abandoned-conversation reaper
    let ttl = chrono::Duration::seconds(config.conversation_ttl_secs as i64);
    let reap_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            if let Err(e) = reap_engine.reap_stale(ttl).await {
                warn!("Conversation reaper failed: {}", e);
            }
        }
    });

    let wallet_bot = Arc::new(WalletBot::new(bot, engine, supervisor));
    info!("Bot is up; waiting for messages");
    wallet_bot.run().await;

    info!("👋 Solwatch stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        assert_eq!(parse_policy("rearm"), RearmPolicy::Rearm);
        assert_eq!(parse_policy("fire-once"), RearmPolicy::FireOnce);
        assert_eq!(parse_policy("FireOnce"), RearmPolicy::FireOnce);
        assert_eq!(parse_policy("anything"), RearmPolicy::Rearm);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["solwatch"]);
        assert_eq!(args.config, "config.json");
        assert_eq!(args.log_level, "info");
        assert!(args.store.is_none());
        assert!(args.poll_interval.is_none());
    }
}

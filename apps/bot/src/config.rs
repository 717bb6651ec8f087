//! Application configuration.

use serde::{Deserialize, Serialize};
use solwatch_core::RearmPolicy;
use solwatch_feeds::{JUPITER_PRICE_URL, MAINNET_RPC_URL};
use tracing::warn;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Alert supervisor configuration.
    pub supervisor: SupervisorSettings,
    /// Persistence configuration.
    pub store: StoreSettings,
    /// External data sources.
    pub feeds: FeedSettings,
    /// Seconds before an abandoned conversation is dropped.
    pub conversation_ttl_secs: u64,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorSettings::default(),
            store: StoreSettings::default(),
            feeds: FeedSettings::default(),
            conversation_ttl_secs: 900,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file; falls back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Invalid config file {}: {}. Using defaults", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

/// Alert supervisor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Polling interval in seconds.
    pub poll_interval_secs: u64,
    /// What happens to an alert after it fires.
    pub rearm_policy: RearmPolicy,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            rearm_policy: RearmPolicy::Rearm,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Used by the sqlite backend only.
    pub database_url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_url: "sqlite://solwatch.db".to_string(),
        }
    }
}

/// Store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile; alerts are lost on restart.
    Memory,
    /// Durable; alerts are rehydrated on startup.
    #[default]
    Sqlite,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Self::Memory,
            _ => Self::Sqlite,
        }
    }
}

/// External data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    pub price_api_url: String,
    pub rpc_endpoint: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            price_api_url: JUPITER_PRICE_URL.to_string(),
            rpc_endpoint: MAINNET_RPC_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.supervisor.poll_interval_secs, 60);
        assert_eq!(config.supervisor.rearm_policy, RearmPolicy::Rearm);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.conversation_ttl_secs, 900);
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!(StoreBackend::parse("memory"), StoreBackend::Memory);
        assert_eq!(StoreBackend::parse("MEM"), StoreBackend::Memory);
        assert_eq!(StoreBackend::parse("sqlite"), StoreBackend::Sqlite);
        assert_eq!(StoreBackend::parse("anything"), StoreBackend::Sqlite);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.store.backend, config.store.backend);
        assert_eq!(parsed.feeds.price_api_url, config.feeds.price_api_url);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/config.json");
        assert_eq!(config.supervisor.poll_interval_secs, 60);
    }
}

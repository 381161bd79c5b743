//! Core configuration structures for the gift pack escrow service

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ledger (escrow contract) configuration
    #[serde(default)]
    pub ledger: LedgerSettings,

    /// Relay configuration for gasless claims
    #[serde(default)]
    pub relay: RelaySettings,

    /// Off-chain store configuration
    #[serde(default)]
    pub store: StoreSettings,

    /// Stale-draft purge configuration
    #[serde(default)]
    pub purge: PurgeSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// On-chain escrow contract connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Whether a ledger connection is configured at all. When false the
    /// service runs in draft-only mode: plans are still generated but
    /// never resumed against on-chain state.
    #[serde(default)]
    pub enabled: bool,

    /// Escrow contract address
    #[serde(default)]
    pub contract_address: String,

    /// RPC endpoint URL
    #[serde(default)]
    pub rpc_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Relay service for gasless claim submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    #[serde(default)]
    pub enabled: bool,

    /// Use the in-process mock relay instead of the REST client
    #[serde(default)]
    pub mock: bool,

    /// Relay REST endpoint
    #[serde(default)]
    pub endpoint: String,

    /// Bearer token for the relay API
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Off-chain pack store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite database path; empty selects the in-memory store
    #[serde(default)]
    pub db_path: String,
}

/// Stale-draft purge sweeper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeSettings {
    /// Sweep interval in seconds
    #[serde(default = "default_purge_interval_secs")]
    pub interval_secs: u64,

    /// Draft retention before purge, in seconds
    #[serde(default = "default_purge_retention_secs")]
    pub retention_secs: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_purge_interval_secs() -> u64 {
    3600 // 1 hour
}

fn default_purge_retention_secs() -> u64 {
    86400 // 24 hours
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerSettings::default(),
            relay: RelaySettings::default(),
            store: StoreSettings::default(),
            purge: PurgeSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            contract_address: String::new(),
            rpc_url: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mock: false,
            endpoint: String::new(),
            api_key: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: String::new(),
        }
    }
}

impl Default for PurgeSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_purge_interval_secs(),
            retention_secs: default_purge_retention_secs(),
        }
    }
}

//! Configuration loading from multiple sources

use crate::{AppConfig, ConfigError, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file.
    ///
    /// Supports TOML and JSON based on file extension.
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        if !matches!(extension, "toml" | "json") {
            return Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            )));
        }

        let content = std::fs::read_to_string(path)?;

        match extension {
            "json" => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<AppConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables.
    ///
    /// Variables are in the format `GIFTLOCK_SECTION__KEY`, for example
    /// `GIFTLOCK_LEDGER__RPC_URL=http://localhost:8545`.
    pub fn from_env() -> Result<AppConfig> {
        Self::from_env_with_prefix("GIFTLOCK")
    }

    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix).separator("__"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Load configuration from a file with environment variable overrides
    /// layered on top.
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        let config = Config::builder()
            .add_source(File::from(path).format(format))
            .add_source(Environment::with_prefix(env_prefix).separator("__"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }
}

//! Configuration validation

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_log_level(&config.log_level) {
        errors.push(e);
    }

    if config.ledger.enabled {
        if config.ledger.contract_address.trim().is_empty() {
            errors.push(ValidationError::new(
                "ledger.contract_address",
                "required when the ledger is enabled",
            ));
        }
        if config.ledger.rpc_url.trim().is_empty() {
            errors.push(ValidationError::new(
                "ledger.rpc_url",
                "required when the ledger is enabled",
            ));
        }
        if config.ledger.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "ledger.timeout_ms",
                "must be greater than 0",
            ));
        }
    }

    if config.relay.enabled && !config.relay.mock {
        if config.relay.endpoint.trim().is_empty() {
            errors.push(ValidationError::new(
                "relay.endpoint",
                "required when the relay is enabled",
            ));
        }
        if config.relay.api_key.trim().is_empty() {
            errors.push(ValidationError::new(
                "relay.api_key",
                "required when the relay is enabled",
            ));
        }
        if config.relay.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "relay.timeout_ms",
                "must be greater than 0",
            ));
        }
    }

    if config.purge.interval_secs == 0 {
        errors.push(ValidationError::new(
            "purge.interval_secs",
            "must be greater than 0",
        ));
    }

    if config.purge.retention_secs == 0 {
        errors.push(ValidationError::new(
            "purge.retention_secs",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::ValidationError(joined))
    }
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(ValidationError::new(
            "log_level",
            format!("unknown log level: {other}"),
        )),
    }
}

//! Configuration loading from disk and the environment.
//!
//! Precedence: environment (`GATEWAY_*`, `PORT`) > config file > defaults.
//! Secrets such as the admin API key are expected to come from the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    parse_config(&fs::read_to_string(path)?)
}

/// Parse TOML text, then override and validate it as [`load_config`] does.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    finalize(config, |key| std::env::var(key).ok())
}

/// Apply environment overrides to `config` and validate the result.
pub fn finalize<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment values onto a parsed configuration.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = get("PORT") {
        config.listener.bind_address = format!("0.0.0.0:{}", port.trim());
    }
    if let Some(addr) = get("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(path) = get("GATEWAY_KEYS_PATH") {
        config.keys.store_path = Some(path);
    }
    if let Some(path) = get("GATEWAY_USAGE_PATH") {
        config.usage.store_path = Some(path);
    }
    if let Some(path) = get("GATEWAY_BOARD_PATH") {
        config.board.store_path = Some(path);
    }
    if let Some(key) = get("GATEWAY_ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
    if let Some(addr) = get("GATEWAY_ADMIN_BIND_ADDRESS") {
        config.admin.bind_address = addr;
    }
    if let Some(ids) = get("GATEWAY_ADMIN_IDENTITIES") {
        config.admin.identities = ids
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
    }
    if let Some(level) = get("GATEWAY_LOG_LEVEL") {
        config.observability.log_level = level;
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so a minimal (or empty) file is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public listener settings.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// API key issuance and storage.
    pub keys: KeysConfig,

    /// Request / visitor accounting.
    pub usage: UsageConfig,

    /// Proxied upstream catalogue.
    pub upstream: UpstreamConfig,

    /// Message board storage.
    pub board: BoardConfig,

    /// Admin channel settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline in seconds.
    pub request_secs: u64,

    /// Deadline for a single upstream fetch in seconds.
    pub upstream_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            upstream_secs: 20,
            connect_secs: 5,
        }
    }
}

/// API key configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeysConfig {
    /// JSON file holding credentials. Unset keeps them in memory only.
    pub store_path: Option<String>,

    /// Number of characters in an issued key.
    pub key_length: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            store_path: Some("data/apikeys.json".to_string()),
            key_length: 6,
        }
    }
}

/// Usage counter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UsageConfig {
    /// JSON file holding the counters. Unset keeps them in memory only.
    pub store_path: Option<String>,

    /// How often counters are persisted, in seconds.
    pub flush_interval_secs: u64,

    /// Visitor deduplication window, in seconds.
    pub visitor_window_secs: u64,

    /// Use the first X-Forwarded-For hop as the source address.
    /// Only enable behind a proxy that sets the header.
    pub trust_forwarded_for: bool,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            store_path: Some("data/usage.json".to_string()),
            flush_interval_secs: 30,
            visitor_window_secs: 24 * 60 * 60,
            trust_forwarded_for: false,
        }
    }
}

/// Upstream proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// User-Agent sent to upstreams.
    pub user_agent: String,

    /// Retry policy for upstream fetches.
    pub retries: RetryConfig,

    /// Proxied routes.
    pub routes: Vec<UpstreamRouteConfig>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("api-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
            retries: RetryConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// One proxied route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamRouteConfig {
    /// Public path, e.g. "/api/ai/gpt3".
    pub path: String,

    /// Upstream URL the query is forwarded to.
    pub target: String,

    /// Query parameters the caller must supply.
    #[serde(default)]
    pub required_params: Vec<String>,

    /// Values used when the caller omits a parameter.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    /// Parameters forwarded upstream. Empty forwards everything except credentials.
    #[serde(default)]
    pub forward_params: Vec<String>,

    /// Require `username` + `apikey`.
    #[serde(default)]
    pub protected: bool,

    /// Message placed in the success envelope.
    #[serde(default = "default_route_message")]
    pub message: String,

    /// Message placed in the failure envelope.
    #[serde(default = "default_failure_message")]
    pub failure_message: String,

    /// JSON pointer into the upstream body, e.g. "/data".
    #[serde(default)]
    pub extract: Option<String>,

    /// Break the extracted text into paragraphs after each sentence.
    #[serde(default)]
    pub format_paragraphs: bool,

    /// Return the upstream body as-is instead of wrapping it.
    #[serde(default)]
    pub passthrough: bool,
}

fn default_route_message() -> String {
    "Success".to_string()
}

fn default_failure_message() -> String {
    "Upstream service unavailable".to_string()
}

/// Message board configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// JSON file holding messages. Unset keeps them in memory only.
    pub store_path: Option<String>,

    /// Maximum message length in characters.
    pub max_text_len: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            store_path: Some("data/messages.json".to_string()),
            max_text_len: 4000,
        }
    }
}

/// Admin channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin listener.
    pub enabled: bool,

    /// API key for the admin transport (Bearer token).
    pub api_key: String,

    /// Admin listener bind address.
    pub bind_address: String,

    /// Identities allowed to run privileged commands (e.g. bot user ids).
    pub identities: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
            identities: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset.
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.keys.key_length, 6);
        assert_eq!(config.usage.visitor_window_secs, 86_400);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_route_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[upstream.routes]]
            path = "/api/ai/gemini-pro"
            target = "https://upstream.example/api/ai/gemini-pro"
            extract = "/data"
            format_paragraphs = true

            [upstream.routes.defaults]
            content = "hai"
            "#,
        )
        .unwrap();

        let route = &config.upstream.routes[0];
        assert_eq!(route.message, "Success");
        assert_eq!(route.defaults.get("content").map(String::as_str), Some("hai"));
        assert!(!route.protected);
        assert!(route.format_paragraphs);
    }
}

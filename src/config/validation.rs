//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, key length, ports valid)
//! - Detect duplicate or malformed upstream routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// Shortest and longest key length accepted.
pub const KEY_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 4..=64;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be > 0"));
    }

    for (field, value) in [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("usage.flush_interval_secs", config.usage.flush_interval_secs),
        ("usage.visitor_window_secs", config.usage.visitor_window_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }

    if !KEY_LENGTH_RANGE.contains(&config.keys.key_length) {
        errors.push(ValidationError::new(
            "keys.key_length",
            format!(
                "must be between {} and {}",
                KEY_LENGTH_RANGE.start(),
                KEY_LENGTH_RANGE.end()
            ),
        ));
    }

    let budget = upstream_budget_secs(config);
    if config.timeouts.request_secs > 0 && config.timeouts.request_secs <= budget {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed the upstream budget of {}s (upstream_secs x max_attempts + backoff)",
                budget
            ),
        ));
    }

    if config.upstream.retries.max_attempts == 0 {
        errors.push(ValidationError::new(
            "upstream.retries.max_attempts",
            "must be at least 1",
        ));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.upstream.routes.iter().enumerate() {
        let field = format!("upstream.routes[{}]", i);
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.path", field),
                "must start with '/'",
            ));
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.path", field),
                format!("duplicate route {}", route.path),
            ));
        }
        match Url::parse(&route.target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                format!("{}.target", field),
                format!("unsupported scheme {}", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("{}.target", field),
                e.to_string(),
            )),
        }
        if let Some(pointer) = &route.extract {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                errors.push(ValidationError::new(
                    format!("{}.extract", field),
                    "must be a JSON pointer starting with '/'",
                ));
            }
        }
    }

    if config.board.max_text_len == 0 {
        errors.push(ValidationError::new("board.max_text_len", "must be > 0"));
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set when the admin channel is enabled",
            ));
        }
        if config.admin.identities.iter().all(|id| id.trim().is_empty()) {
            errors.push(ValidationError::new(
                "admin.identities",
                "at least one admin identity is required",
            ));
        }
    }

    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Worst-case seconds an upstream fetch may take: every attempt runs to the
/// upstream deadline, with the longest backoff between attempts.
fn upstream_budget_secs(config: &GatewayConfig) -> u64 {
    let attempts = u64::from(config.upstream.retries.max_attempts.max(1));
    let backoff_ms = config
        .upstream
        .retries
        .max_delay_ms
        .saturating_mul(attempts - 1);
    config
        .timeouts
        .upstream_secs
        .saturating_mul(attempts)
        .saturating_add(backoff_ms.div_ceil(1000))
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("'{}' is not a socket address", value),
        ));
    }
}

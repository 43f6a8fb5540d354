//! Structured logging.
//!
//! `RUST_LOG` takes precedence; otherwise the configured level applies to this
//! crate and tower-http, with everything else at `warn`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(log_level));

    // A subscriber may already be installed (tests, embedding); that is fine.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn default_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(format!(
        "warn,api_gateway={level},tower_http={level}",
        level = log_level
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn,api_gateway=info,tower_http=info"))
}

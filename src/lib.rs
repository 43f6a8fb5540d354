//! API gateway: key issuance, usage accounting and a uniform JSON envelope
//! over a configurable catalogue of upstream services.

pub mod admin;
pub mod board;
pub mod config;
pub mod error;
pub mod http;
pub mod keys;
pub mod lifecycle;
pub mod observability;
pub mod storage;
pub mod upstream;
pub mod usage;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

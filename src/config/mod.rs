//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, overlay GATEWAY_* environment)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → injected into subsystems at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads + validates new config (unchanged contents are skipped)
//!     → server swaps upstream catalogue and admin identities
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Secrets and deployment URLs come from configuration, never from code

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BoardConfig, GatewayConfig, KeysConfig, ListenerConfig, ObservabilityConfig,
    RetryConfig, TimeoutConfig, UpstreamConfig, UpstreamRouteConfig, UsageConfig,
};

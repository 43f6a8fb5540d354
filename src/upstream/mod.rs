//! Upstream proxy.
//!
//! Routes listed under `[upstream]` in the config are forwarded to their
//! collaborator with the caller's query (credentials removed) and the reply is
//! reshaped into the gateway envelope. The catalogue is swapped atomically on
//! config reload.

pub mod catalogue;
pub mod client;
pub mod format;
pub mod retry;

pub use catalogue::{Catalogue, UpstreamRoute};
pub use client::{UpstreamClient, UpstreamError};
pub use retry::RetryPolicy;

//! Public HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (x-request-id)
//!     → middleware/usage.rs (count request, dedupe visitor)
//!     → server.rs router
//!         → handlers/keys.rs, stats.rs, telemetry.rs, board.rs, health.rs
//!         → middleware/api_key.rs (protected routes)
//!         → handlers/upstream.rs (catalogue fallback)
//!     → response.rs ({result, ...} envelope)
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};

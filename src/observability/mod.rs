//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) is set by the HTTP layer and appears in trace spans
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

//! Usage accounting subsystem.
//!
//! # Data Flow
//! ```text
//! every inbound request
//!     → http::middleware::usage (first layer after request id)
//!     → counters.rs (atomic total + per-address visit dedup)
//!
//! flusher.rs (background task)
//!     → compact expired addresses
//!     → persist UsageDocument when dirty
//!
//! GET /api/statistics, admin /stats
//!     → counters.rs snapshot()
//! ```
//!
//! # Design Decisions
//! - Counting never waits on storage; persistence is periodic and best effort
//! - Losing increments between the last flush and a crash is accepted
//! - Visitors are derived from visit records, never incremented separately

pub mod counters;
pub mod flusher;

pub use counters::{UsageCounters, UsageDocument, UsageSnapshot, VisitEntry};
pub use flusher::UsageFlusher;

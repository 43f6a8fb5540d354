//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     config → open stores (keys, usage, board) → router → listeners
//!
//! Signals (signals.rs):
//!     SIGTERM / Ctrl+C → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     public listener drains → admin listener, reload loop and usage
//!     flusher stop → final usage flush → final key store flush
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{open_stores, StartupError, Stores};

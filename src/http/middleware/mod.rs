//! Request middleware for the public router.

pub mod api_key;
pub mod rejections;
pub mod usage;

pub use api_key::{require_api_key, AuthenticatedAccount};
pub use rejections::{envelope_rejections, method_not_allowed};
pub use usage::{track_usage, UsageLayerState};

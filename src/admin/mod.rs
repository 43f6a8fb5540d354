//! Admin channel.
//!
//! # Data Flow
//! ```text
//! transport (admin HTTP listener / gateway-cli / chat bot)
//!     → auth.rs (transport bearer token)
//!     → handlers.rs (relay identity + text)
//!     → channel.rs (parse, privilege check, execute)
//!         → keys (issue / rotate / delete / delete all)
//!         → usage (snapshot)
//! ```

pub mod auth;
pub mod channel;
pub mod commands;
pub mod handlers;
pub mod policy;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::keys::KeyStore;
use crate::usage::UsageCounters;

use self::auth::admin_auth_middleware;
use self::handlers::*;

pub use channel::{AdminChannel, AdminReply, ReplyKind};
pub use commands::AdminCommand;
pub use policy::{AdminIdentities, PrivilegePolicy};

/// State shared by the admin transport.
#[derive(Clone)]
pub struct AdminState {
    pub channel: Arc<AdminChannel>,
    pub keys: Arc<KeyStore>,
    pub usage: Arc<UsageCounters>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/commands", post(post_command))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

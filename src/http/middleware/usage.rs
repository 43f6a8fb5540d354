//! Request accounting.
//!
//! Runs in front of every route, so failed, rejected and unknown requests are
//! counted the same as successful ones.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::usage::UsageCounters;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Clone)]
pub struct UsageLayerState {
    pub counters: Arc<UsageCounters>,
    pub trust_forwarded_for: bool,
}

pub async fn track_usage(
    State(state): State<UsageLayerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let source = source_address(&request, state.trust_forwarded_for);
    state.counters.record_request(&source);
    next.run(request).await
}

/// The address a request is attributed to.
///
/// `ConnectInfo` is read from the extensions directly so routers served
/// without connect info (tests, embedding) still count under `"unknown"`.
pub fn source_address<B>(request: &Request<B>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

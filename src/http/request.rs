//! Request id propagation.
//!
//! Every request gets an `x-request-id` (UUID v4) as early as possible; an id
//! supplied by the client is kept. The same id is echoed on the response so
//! log lines and client reports can be correlated.

use axum::http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// The request id assigned by [`set_request_id_layer`], or `"unknown"`.
pub fn request_id<B>(request: &axum::http::Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

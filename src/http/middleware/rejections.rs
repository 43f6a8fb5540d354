//! Envelope for rejections produced by tower layers.
//!
//! The request timeout and body limit layers answer on their own, below any
//! handler, with an empty or plain-text body. This middleware sits above them
//! and rewrites those answers into the `{result:false, message}` envelope.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::http::response::failure;

pub const TIMED_OUT: &str = "Request timed out";
pub const BODY_TOO_LARGE: &str = "Request body too large";

pub async fn envelope_rejections(request: Request, next: Next) -> Response {
    let id = request_id(&request);
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    match response.status() {
        StatusCode::REQUEST_TIMEOUT => {
            tracing::warn!(request_id = %id, path = %path, "Request deadline exceeded");
            failure(StatusCode::INTERNAL_SERVER_ERROR, TIMED_OUT)
        }
        StatusCode::PAYLOAD_TOO_LARGE if !is_json(&response) => {
            tracing::debug!(request_id = %id, path = %path, "Request body over limit");
            failure(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE)
        }
        _ => response,
    }
}

/// Method mismatch on a known path.
pub async fn method_not_allowed() -> Response {
    failure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

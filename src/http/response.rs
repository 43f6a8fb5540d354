//! The `{result, ...}` envelope every public response is wrapped in.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `result` plus the route-specific fields, flattened into one object.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub result: bool,
    #[serde(flatten)]
    pub body: T,
}

/// Body for responses that only carry a message.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

pub fn success<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(Envelope { result: true, body })).into_response()
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Message {
        message: message.into(),
    };
    (status, Json(Envelope { result: false, body })).into_response()
}

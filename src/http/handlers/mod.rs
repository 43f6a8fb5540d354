//! Public route handlers.

pub mod board;
pub mod health;
pub mod keys;
pub mod stats;
pub mod telemetry;
pub mod upstream;

use axum::extract::rejection::JsonRejection;

use crate::error::GatewayError;

/// Body rejections render as the 400 envelope instead of axum's plain text.
pub(crate) fn invalid_body(rejection: JsonRejection) -> GatewayError {
    GatewayError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}

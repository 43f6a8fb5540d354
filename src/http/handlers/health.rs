use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::http::response::success;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

pub async fn health() -> Response {
    success(StatusCode::OK, Health { status: "ok" })
}

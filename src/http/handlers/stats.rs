use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::http::response::success;
use crate::http::server::AppState;

/// `GET /api/statistics`: `{result, totalRequests, totalVisitors}`.
///
/// The request being answered has already been counted by the usage middleware.
pub async fn statistics(State(state): State<AppState>) -> Response {
    success(StatusCode::OK, state.usage.snapshot())
}

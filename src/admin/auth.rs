use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::admin::AdminState;
use crate::http::response::failure;

/// Require `Authorization: Bearer <admin.api_key>` on the admin transport.
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token == &*state.api_key)
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request without valid token");
        failure(StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

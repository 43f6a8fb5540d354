//! Catalogue-driven proxy routes.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};
use crate::http::middleware::api_key::authenticate;
use crate::http::request::request_id;
use crate::http::response::success;
use crate::http::server::AppState;
use crate::upstream::format::shape;

#[derive(Serialize)]
struct Proxied {
    message: String,
    data: Value,
}

/// Fallback handler: proxy catalogue routes, 404 everything else.
pub async fn proxy(
    State(state): State<AppState>,
    request: Request<Body>,
) -> GatewayResult<Response> {
    let path = request.uri().path();
    let route = state
        .catalogue
        .load()
        .get(path)
        .filter(|_| *request.method() == Method::GET || *request.method() == Method::HEAD)
        .ok_or_else(|| GatewayError::NotFound(format!("Endpoint {} not found", path)))?;

    if route.protected {
        authenticate(&state.validator, &request)?;
    }

    let supplied: HashMap<String, String> = Query::try_from_uri(request.uri())
        .map(|Query(p)| p)
        .map_err(|_| GatewayError::Validation("Malformed query string".into()))?;

    let missing = route.missing_params(&supplied);
    if !missing.is_empty() {
        return Err(GatewayError::Validation(format!(
            "Missing required parameter(s): {}",
            missing.join(", ")
        )));
    }

    let params = route.upstream_params(&supplied);
    let body = state
        .upstream
        .fetch(&route.path, &route.target, &params)
        .await
        .map_err(|e| {
            tracing::error!(
                request_id = %request_id(&request),
                route = %route.path,
                target = %route.target,
                error = %e,
                "Upstream request failed"
            );
            GatewayError::Upstream(route.failure_message.clone())
        })?;

    if route.passthrough {
        return Ok((StatusCode::OK, Json(body)).into_response());
    }

    Ok(success(
        StatusCode::OK,
        Proxied {
            message: route.message.clone(),
            data: shape(body, route.extract.as_deref(), route.format_paragraphs),
        },
    ))
}

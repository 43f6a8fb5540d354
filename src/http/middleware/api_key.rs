//! `?username=&apikey=` guard for protected routes.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{Query, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::keys::{CredentialRecord, KeyError, KeyValidator};

/// The credential a protected request was admitted with.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount(pub CredentialRecord);

/// Validate `username` + `apikey` from the query string, answering 400 / 401 / 403
/// on failure.
pub async fn require_api_key(
    State(validator): State<KeyValidator>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&validator, &request) {
        Ok(record) => {
            request.extensions_mut().insert(AuthenticatedAccount(record));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Run the validator against the credentials in `request`'s query string.
pub fn authenticate<B>(
    validator: &KeyValidator,
    request: &Request<B>,
) -> Result<CredentialRecord, GatewayError> {
    let params: HashMap<String, String> = Query::try_from_uri(request.uri())
        .map(|Query(p)| p)
        .unwrap_or_default();

    let username = params.get("username").map(String::as_str).unwrap_or("");
    let apikey = params.get("apikey").map(String::as_str).unwrap_or("");

    validator.validate(username, apikey).map_err(|e| match e {
        KeyError::MissingAccountId => {
            GatewayError::Validation("Missing username parameter".into())
        }
        KeyError::MissingKey => {
            GatewayError::Authentication("Missing apikey parameter".into())
        }
        other => {
            tracing::debug!(username = %username, reason = %other, "Rejected API key");
            other.into()
        }
    })
}

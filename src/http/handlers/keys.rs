//! Key issuance and self-check.

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::http::middleware::AuthenticatedAccount;
use crate::http::response::success;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct IssueParams {
    #[serde(rename = "accountId")]
    pub account_id: Option<String>,
}

#[derive(Serialize)]
struct Issued {
    apikey: String,
    message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Verified {
    username: String,
    created_at: u64,
}

/// `GET /api/keys?accountId=`: 201 with a fresh key, 200 with the existing one.
pub async fn issue_key(
    State(state): State<AppState>,
    params: Result<Query<IssueParams>, QueryRejection>,
) -> GatewayResult<Response> {
    let Query(params) = params.map_err(|e| {
        GatewayError::Validation(format!("Invalid query: {}", e.body_text()))
    })?;

    let account_id = params
        .account_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| GatewayError::Validation("Missing accountId parameter".into()))?;

    let outcome = state.issuer.issue(&account_id).await?;
    let (status, message) = if outcome.is_new {
        (StatusCode::CREATED, "API key created")
    } else {
        (StatusCode::OK, "API key already exists")
    };

    Ok(success(
        status,
        Issued {
            apikey: outcome.record.key,
            message,
        },
    ))
}

/// `GET /api/keys/verify?username=&apikey=`, behind the key guard.
pub async fn verify_key(
    Extension(AuthenticatedAccount(record)): Extension<AuthenticatedAccount>,
) -> Response {
    success(
        StatusCode::OK,
        Verified {
            username: record.account_id,
            created_at: record.created_at,
        },
    )
}

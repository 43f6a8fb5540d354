//! Request-level error taxonomy.
//!
//! Every variant renders the same `{result: false, message}` envelope as a
//! successful response, so clients only ever have to look at `result`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::failure;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or malformed request parameter.
    #[error("{0}")]
    Validation(String),

    /// No credential was supplied.
    #[error("{0}")]
    Authentication(String),

    /// A credential was supplied but is not valid.
    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    /// An upstream collaborator failed or timed out. The message is what the
    /// caller sees; upstream details are logged where the failure happens.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Authentication(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Authorization(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        failure(status, self.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Authentication("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::Authorization("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::Upstream("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

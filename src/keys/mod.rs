//! API key lifecycle.
//!
//! # Data Flow
//! ```text
//! GET /api/keys?accountId=..   → issuer.rs (idempotent issue)
//!                                  → store.rs (single-writer, persisted)
//! protected route ?username&apikey
//!                              → validator.rs (400 / 401 / 403 split)
//!                                  → store.rs (lock-free snapshot read)
//! admin channel                → issuer.rs (rotate) / store.rs (delete, delete_all)
//! ```

pub mod issuer;
pub mod record;
pub mod store;
pub mod validator;

use thiserror::Error;

use crate::error::GatewayError;

pub use issuer::{IssueOutcome, KeyIssuer};
pub use record::CredentialRecord;
pub use store::{KeyMap, KeyStore};
pub use validator::KeyValidator;

/// Reasons a key operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Missing account identifier")]
    MissingAccountId,

    #[error("Invalid account identifier: {0}")]
    InvalidAccountId(String),

    #[error("Missing API key")]
    MissingKey,

    /// No key has been issued for the claimed account.
    #[error("No API key has been issued for this account")]
    MissingCredential,

    #[error("Invalid API key")]
    InvalidCredential,
}

impl From<KeyError> for GatewayError {
    fn from(err: KeyError) -> Self {
        let message = err.to_string();
        match err {
            KeyError::MissingAccountId | KeyError::InvalidAccountId(_) => {
                GatewayError::Validation(message)
            }
            KeyError::MissingKey => GatewayError::Authentication(message),
            KeyError::MissingCredential | KeyError::InvalidCredential => {
                GatewayError::Authorization(message)
            }
        }
    }
}

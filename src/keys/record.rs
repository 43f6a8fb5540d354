//! Credential records and account identifiers.

use serde::{Deserialize, Serialize};

use crate::keys::KeyError;
use crate::unix_now;

/// Longest account identifier accepted from callers.
pub const MAX_ACCOUNT_ID_LEN: usize = 64;

/// An API key issued to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub account_id: String,
    pub key: String,
    /// Issue time, seconds since epoch.
    pub created_at: u64,
    /// Set when the key was replaced by a rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<u64>,
}

impl CredentialRecord {
    pub fn new(account_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            key: key.into(),
            created_at: unix_now(),
            revoked_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Compare a supplied key without short-circuiting on the first mismatch.
    pub fn matches(&self, supplied: &str) -> bool {
        let stored = self.key.as_bytes();
        let supplied = supplied.as_bytes();
        if stored.len() != supplied.len() {
            return false;
        }
        stored
            .iter()
            .zip(supplied)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Normalize a caller-supplied account identifier.
///
/// Identifiers are untrusted: they are trimmed, must be non-empty, at most
/// [`MAX_ACCOUNT_ID_LEN`] characters, and free of whitespace or control characters.
pub fn parse_account_id(raw: &str) -> Result<String, KeyError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(KeyError::MissingAccountId);
    }
    if id.chars().count() > MAX_ACCOUNT_ID_LEN {
        return Err(KeyError::InvalidAccountId(format!(
            "must be at most {} characters",
            MAX_ACCOUNT_ID_LEN
        )));
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(KeyError::InvalidAccountId(
            "must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(id.to_string())
}

//! Credential checks for protected operations.

use std::sync::Arc;

use crate::keys::record::CredentialRecord;
use crate::keys::store::KeyStore;
use crate::keys::KeyError;
use crate::observability::metrics;

#[derive(Clone)]
pub struct KeyValidator {
    store: Arc<KeyStore>,
}

impl KeyValidator {
    pub fn new(store: Arc<KeyStore>) -> Self {
        Self { store }
    }

    /// Resolve `(account, key)` to the account's live credential.
    ///
    /// A missing account and a missing key are reported separately from a key
    /// that does not match, since callers use the distinction to tell a
    /// forgotten parameter from a wrong credential.
    pub fn validate(&self, account_id: &str, key: &str) -> Result<CredentialRecord, KeyError> {
        let result = self.check(account_id.trim(), key.trim());
        metrics::record_key_validation(match &result {
            Ok(_) => "ok",
            Err(KeyError::MissingAccountId) | Err(KeyError::InvalidAccountId(_)) => {
                "missing_account"
            }
            Err(KeyError::MissingKey) => "missing_key",
            Err(KeyError::MissingCredential) => "unknown_account",
            Err(KeyError::InvalidCredential) => "mismatch",
        });
        result
    }

    fn check(&self, account_id: &str, key: &str) -> Result<CredentialRecord, KeyError> {
        if account_id.is_empty() {
            return Err(KeyError::MissingAccountId);
        }
        if key.is_empty() {
            return Err(KeyError::MissingKey);
        }

        let record = self
            .store
            .get(account_id)
            .ok_or(KeyError::MissingCredential)?;

        if record.matches(key) {
            Ok(record)
        } else {
            tracing::debug!(account = %account_id, "API key mismatch");
            Err(KeyError::InvalidCredential)
        }
    }
}

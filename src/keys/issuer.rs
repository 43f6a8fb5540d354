//! API key issuance and rotation.

use std::sync::Arc;

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

use crate::keys::record::{parse_account_id, CredentialRecord};
use crate::keys::store::KeyStore;
use crate::keys::KeyError;
use crate::observability::metrics;

/// Result of an issue request.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub record: CredentialRecord,
    /// False when the account already had a live key.
    pub is_new: bool,
}

/// Generates credentials and hands them to the [`KeyStore`].
///
/// Keys are short on purpose so people can type them: `key_length` symbols from
/// the 62-character alphanumeric alphabet (~5.95 bits each, ~35.7 bits for the
/// default of 6). They are drawn from the OS CSPRNG, but the length alone makes
/// them unsuitable as high-value secrets.
#[derive(Clone)]
pub struct KeyIssuer {
    store: Arc<KeyStore>,
    key_length: usize,
}

impl KeyIssuer {
    pub fn new(store: Arc<KeyStore>, key_length: usize) -> Self {
        Self { store, key_length }
    }

    pub fn store(&self) -> &Arc<KeyStore> {
        &self.store
    }

    /// Issue a key for an account, or return the one it already has.
    pub async fn issue(&self, account_id: &str) -> Result<IssueOutcome, KeyError> {
        let account = parse_account_id(account_id)?;
        let key_length = self.key_length;

        let (record, is_new) = self
            .store
            .get_or_insert_with(&account, || {
                CredentialRecord::new(account.clone(), generate_key(key_length))
            })
            .await;

        if is_new {
            metrics::record_key_issued();
            tracing::info!(account = %account, "Issued API key");
        }

        Ok(IssueOutcome { record, is_new })
    }

    /// Replace the account's key with a fresh one, keeping the old one in history.
    pub async fn rotate(&self, account_id: &str) -> Result<CredentialRecord, KeyError> {
        let account = parse_account_id(account_id)?;
        let record = self
            .store
            .put(CredentialRecord::new(account.clone(), generate_key(self.key_length)))
            .await;

        metrics::record_key_issued();
        tracing::info!(account = %account, "Rotated API key");
        Ok(record)
    }
}

/// Draw a random alphanumeric key from the OS random source.
pub fn generate_key(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

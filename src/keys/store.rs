//! Credential persistence.
//!
//! Readers get a consistent snapshot of the whole map through [`ArcSwap`] and
//! never block. Writers are serialized by a single async mutex: each mutation
//! clones the current map, edits the clone, publishes it, and then persists it
//! while still holding the lock, so the on-disk order matches the publish order.
//!
//! Persistence failures are logged and counted but never returned. The published
//! in-memory map stays authoritative and the next successful save carries it.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use crate::keys::record::CredentialRecord;
use crate::observability::metrics;
use crate::storage::{SnapshotStore, StoreError};
use crate::unix_now;

/// account id -> every key that account was ever issued, oldest first.
pub type KeyMap = BTreeMap<String, Vec<CredentialRecord>>;

pub struct KeyStore {
    current: ArcSwap<KeyMap>,
    writer: Mutex<()>,
    backend: Arc<dyn SnapshotStore<KeyMap>>,
}

impl KeyStore {
    /// Restore the store from its backend.
    pub async fn load(backend: Arc<dyn SnapshotStore<KeyMap>>) -> Result<Self, StoreError> {
        let map = backend.load().await?.unwrap_or_default();
        tracing::info!(
            accounts = map.len(),
            location = %backend.describe(),
            "Loaded credential store"
        );
        Ok(Self {
            current: ArcSwap::from_pointee(map),
            writer: Mutex::new(()),
            backend,
        })
    }

    /// The live credential for an account.
    pub fn get(&self, account_id: &str) -> Option<CredentialRecord> {
        live(&self.current.load(), account_id).cloned()
    }

    /// Every credential ever issued to an account, oldest first.
    pub fn history(&self, account_id: &str) -> Vec<CredentialRecord> {
        self.current
            .load()
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of accounts with at least one record.
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a new live credential, revoking whatever was live for that account.
    pub async fn put(&self, record: CredentialRecord) -> CredentialRecord {
        self.mutate(|map| {
            let history = map.entry(record.account_id.clone()).or_default();
            let now = unix_now();
            for old in history.iter_mut().filter(|r| r.is_live()) {
                old.revoked_at = Some(now);
            }
            history.push(record.clone());
            (record, true)
        })
        .await
    }

    /// Return the live credential, creating it with `make` if there is none.
    ///
    /// The lookup and the insert happen under the writer lock, so concurrent
    /// callers for the same account all observe a single credential.
    pub async fn get_or_insert_with<F>(&self, account_id: &str, make: F) -> (CredentialRecord, bool)
    where
        F: FnOnce() -> CredentialRecord,
    {
        if let Some(existing) = self.get(account_id) {
            return (existing, false);
        }

        self.mutate(|map| {
            if let Some(existing) = live(map, account_id) {
                return ((existing.clone(), false), false);
            }
            let record = make();
            map.entry(account_id.to_string())
                .or_default()
                .push(record.clone());
            ((record, true), true)
        })
        .await
    }

    /// Remove an account and its history. Returns whether it existed.
    pub async fn delete(&self, account_id: &str) -> bool {
        self.mutate(|map| {
            let removed = map.remove(account_id).is_some();
            (removed, removed)
        })
        .await
    }

    /// Remove every account. Returns how many were removed.
    pub async fn delete_all(&self) -> usize {
        self.mutate(|map| {
            let count = map.len();
            map.clear();
            (count, count > 0)
        })
        .await
    }

    /// Persist the current map regardless of pending changes.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        let snapshot = self.current.load_full();
        self.backend.save(&snapshot).await
    }

    async fn mutate<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut KeyMap) -> (R, bool),
    {
        let _guard = self.writer.lock().await;
        let mut next = KeyMap::clone(&self.current.load());
        let (out, changed) = f(&mut next);
        if !changed {
            return out;
        }

        let next = Arc::new(next);
        self.current.store(next.clone());

        if let Err(e) = self.backend.save(&next).await {
            metrics::record_persistence_failure("keys");
            tracing::error!(
                error = %e,
                location = %self.backend.describe(),
                "Failed to persist credential store, keeping in-memory state"
            );
        }
        out
    }
}

fn live<'a>(map: &'a KeyMap, account_id: &str) -> Option<&'a CredentialRecord> {
    map.get(account_id)
        .and_then(|history| history.iter().rev().find(|r| r.is_live()))
}

//! Durable snapshot storage.
//!
//! Every piece of persisted state in the gateway (credentials, usage counters,
//! message board) is a single serde document that is loaded once at startup and
//! replaced wholesale on save. Subsystems only see the [`SnapshotStore`] trait so
//! the backend can be swapped (JSON file in production, memory in tests).
//!
//! # Design Decisions
//! - Saves are atomic replaces: write `<path>.tmp`, then rename over the target
//! - Callers are responsible for serializing their own writers
//! - A missing file is "nothing persisted yet", not an error

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors raised by a snapshot backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse snapshot at {path}: {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A durable home for one serde document.
#[async_trait]
pub trait SnapshotStore<T>: Send + Sync
where
    T: Send + Sync,
{
    /// Load the last saved document, `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<T>, StoreError>;

    /// Replace the stored document.
    async fn save(&self, value: &T) -> Result<(), StoreError>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// Stores a document as pretty-printed JSON on disk.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl<T> SnapshotStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self) -> Result<Option<T>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Deserialize {
                path: self.path.display().to_string(),
                source,
            })
    }

    async fn save(&self, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_err(e))?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| self.io_err(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps the document in process memory. Used when no path is configured.
pub struct MemoryStore<T> {
    slot: Mutex<Option<T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> SnapshotStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync,
{
    async fn load(&self) -> Result<Option<T>, StoreError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, value: &T) -> Result<(), StoreError> {
        *self.slot.lock().await = Some(value.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Pick the backend for an optional configured path.
pub fn open<T>(path: Option<&str>) -> std::sync::Arc<dyn SnapshotStore<T>>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    match path {
        Some(p) if !p.trim().is_empty() => std::sync::Arc::new(JsonFileStore::new(p)),
        _ => std::sync::Arc::new(MemoryStore::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<HashMap<String, u32>> =
            JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        let store = JsonFileStore::new(&path);
        let mut doc = HashMap::new();
        doc.insert("alice".to_string(), 3u32);
        store.save(&doc).await.unwrap();

        let reopened: JsonFileStore<HashMap<String, u32>> = JsonFileStore::new(&path);
        let loaded = reopened.load().await.unwrap().unwrap();
        assert_eq!(loaded.get("alice"), Some(&3));
        assert!(!dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{not json").unwrap();

        let store: JsonFileStore<HashMap<String, u32>> = JsonFileStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(StoreError::Deserialize { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(vec![1, 2, 3]));
    }
}

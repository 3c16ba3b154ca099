//! Storage layer
//!
//! Keyed JSON documents behind a pluggable backend. The long-running bot
//! keeps sessions and usage counters in memory and the allow-list on disk;
//! the webhook deployment keeps everything on disk because no in-memory
//! state survives between invocations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Backend storing raw string payloads under flat keys.
///
/// Keys are restricted to `[A-Za-z0-9_-]` by convention; callers build them
/// from user ids and fixed prefixes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn put(&self, key: &str, data: String) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed store: one `<key>.json` per key under a root directory.
///
/// Writes overwrite the whole document (last write wins).
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn put(&self, key: &str, data: String) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(key), data).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// In-memory store for the long-running deployment and for tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Other("memory store poisoned".into()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn put(&self, key: &str, data: String) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), data);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Typed JSON facade over a [`KeyValueStore`] backend.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Storage over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Storage over `<root>/<key>.json` files.
    #[must_use]
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(root)))
    }

    /// Load a JSON document, `None` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read or deserialization fails.
    pub async fn load_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.backend.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Save a JSON document, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub async fn save_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        data: &T,
    ) -> Result<(), StorageError> {
        let body = serde_json::to_string_pretty(data)?;
        self.backend.put(key, body).await
    }

    /// Delete a document; deleting an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend removal fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        debug!("Deleting storage key {key}");
        self.backend.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Doc {
        value: u32,
    }

    #[tokio::test]
    async fn test_memory_roundtrip() -> Result<(), StorageError> {
        let storage = Storage::in_memory();

        assert_eq!(storage.load_json::<Doc>("doc").await?, None);

        storage.save_json("doc", &Doc { value: 7 }).await?;
        assert_eq!(storage.load_json::<Doc>("doc").await?, Some(Doc { value: 7 }));

        storage.delete("doc").await?;
        assert_eq!(storage.load_json::<Doc>("doc").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let storage = Storage::on_disk(dir.path());

        storage.save_json("doc", &Doc { value: 42 }).await?;
        assert!(dir.path().join("doc.json").exists());
        assert_eq!(
            storage.load_json::<Doc>("doc").await?,
            Some(Doc { value: 42 })
        );

        // Overwrite semantics
        storage.save_json("doc", &Doc { value: 43 }).await?;
        assert_eq!(
            storage.load_json::<Doc>("doc").await?,
            Some(Doc { value: 43 })
        );

        // Deleting twice is fine
        storage.delete("doc").await?;
        storage.delete("doc").await?;
        assert_eq!(storage.load_json::<Doc>("doc").await?, None);
        Ok(())
    }
}

//! Storage backend trait and the in-process implementations.

use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

/// Key written and removed again by [`StorageBackend::probe`].
pub const PROBE_KEY: &str = "__storage_test__";

/// Errors raised by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage medium cannot be used at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File locking error.
    #[error("lock error: {0}")]
    Lock(String),
}

/// A raw string key/value medium.
///
/// This is the seam between the persistent store and whatever actually keeps
/// the bytes (a directory of JSON files, process memory, ...). Keys arrive
/// already namespaced by the caller.
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Checks that the medium accepts a write/remove cycle.
    fn probe(&self) -> Result<(), StorageError> {
        self.set(PROBE_KEY, PROBE_KEY)?;
        self.remove(PROBE_KEY)
    }
}

/// Backend that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Backend used when no storage medium could be opened.
///
/// Every call fails with [`StorageError::Unavailable`], which the persistent
/// store turns into no-ops and defaults.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StorageError {
        StorageError::Unavailable(self.reason.clone())
    }
}

impl StorageBackend for UnavailableBackend {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(self.error())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(self.error())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        backend.set("a", "1").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some("1".to_string()));

        backend.remove("a").unwrap();
        assert_eq!(backend.get("a").unwrap(), None);
    }

    #[test]
    fn test_memory_backend_probe_leaves_no_key() {
        let backend = MemoryBackend::new();
        backend.probe().unwrap();
        assert!(backend.get(PROBE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_unavailable_backend_fails_everything() {
        let backend = UnavailableBackend::new("disabled");
        assert!(backend.probe().is_err());
        assert!(matches!(
            backend.get("a"),
            Err(StorageError::Unavailable(reason)) if reason == "disabled"
        ));
    }
}

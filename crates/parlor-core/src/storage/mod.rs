//! Persistent key/value store.
//!
//! A JSON-capable wrapper over a [`StorageBackend`]. Every key is namespaced
//! under a fixed prefix. When the backend fails, operations degrade to no-ops
//! returning defaults and the failure is logged, never raised.

mod backend;
mod preferences;

pub use backend::{MemoryBackend, PROBE_KEY, StorageBackend, StorageError, UnavailableBackend};
pub use preferences::Preferences;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Default namespace prefix for every stored key.
pub const DEFAULT_PREFIX: &str = "birthday_";

/// Key of the multi-session chat document.
pub const SESSIONS_KEY: &str = "chat_sessions";

/// Key of the pre-session flat chat history.
pub const LEGACY_HISTORY_KEY: &str = "chat_history";

/// Key of the user preferences document.
pub const PREFERENCES_KEY: &str = "preferences";

/// Namespaced JSON store over a storage backend.
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
}

impl PersistentStore {
    /// Creates a store over `backend` using `prefix` for every key.
    pub fn new(backend: Arc<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// Creates a store that only lives in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), DEFAULT_PREFIX)
    }

    /// Creates a store whose every write fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(Arc::new(UnavailableBackend::new(reason)), DEFAULT_PREFIX)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Returns whether the backend currently accepts writes.
    pub fn is_available(&self) -> bool {
        self.backend.probe().is_ok()
    }

    /// Serializes `value` under `key`.
    ///
    /// Returns `false` if the store is unavailable or the write failed.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to encode value for storage");
                return false;
            }
        };

        match self.backend.set(&self.full_key(key), &encoded) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to save to storage");
                false
            }
        }
    }

    /// Loads and decodes the value under `key`.
    ///
    /// Missing keys, unavailable storage and undecodable values all yield `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(&self.full_key(key)) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to load from storage");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored value could not be decoded");
                None
            }
        }
    }

    /// Loads the value under `key`, falling back to `default`.
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.load(key).unwrap_or(default)
    }

    /// Removes `key`. Failures are logged.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(&self.full_key(key)) {
            tracing::warn!(key, error = %e, "Failed to remove from storage");
        }
    }

    /// Saves the user preferences document.
    pub fn save_preferences(&self, prefs: &Preferences) -> bool {
        self.save(PREFERENCES_KEY, prefs)
    }

    /// Loads the user preferences document, or defaults.
    pub fn load_preferences(&self) -> Preferences {
        self.load_or(PREFERENCES_KEY, Preferences::default())
    }
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_save_and_load_with_prefix() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PersistentStore::new(backend.clone(), "test_");

        assert!(store.save("numbers", &vec![1, 2, 3]));
        assert_eq!(store.load::<Vec<i32>>("numbers"), Some(vec![1, 2, 3]));
        assert_eq!(backend.get("test_numbers").unwrap(), Some("[1,2,3]".to_string()));
    }

    #[test]
    fn test_load_missing_returns_default() {
        let store = PersistentStore::in_memory();
        let value: HashMap<String, String> = store.load_or("missing", HashMap::new());
        assert!(value.is_empty());
    }

    #[test]
    fn test_corrupt_value_returns_default() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("birthday_broken", "{ not json").unwrap();
        let store = PersistentStore::new(backend, DEFAULT_PREFIX);

        assert_eq!(store.load_or("broken", 7u32), 7);
    }

    #[test]
    fn test_unavailable_store_degrades() {
        let store = PersistentStore::unavailable("no medium");

        assert!(!store.is_available());
        assert!(!store.save("key", &1));
        assert_eq!(store.load::<i32>("key"), None);
        store.remove("key");
    }

    #[test]
    fn test_remove_only_touches_prefixed_key() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("preferences", "1").unwrap();
        let store = PersistentStore::new(backend.clone(), DEFAULT_PREFIX);
        store.save(PREFERENCES_KEY, &2);

        store.remove(PREFERENCES_KEY);

        assert!(backend.get("birthday_preferences").unwrap().is_none());
        assert_eq!(backend.get("preferences").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_preferences_default_when_missing() {
        let store = PersistentStore::in_memory();
        let prefs = store.load_preferences();
        assert!(prefs.preferred_character.is_none());
    }

    #[test]
    fn test_preferences_ignore_splash_fields() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(
                "birthday_preferences",
                r#"{"hasVisitedSplash":true,"preferredCharacter":"character-c","viewedPuns":["p1"]}"#,
            )
            .unwrap();
        let store = PersistentStore::new(backend, DEFAULT_PREFIX);

        let prefs = store.load_preferences();
        assert_eq!(prefs.preferred_character.as_deref(), Some("character-c"));
    }
}

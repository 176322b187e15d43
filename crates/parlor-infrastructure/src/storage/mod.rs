//! Storage layer.
//!
//! - `atomic_file`: lock + tmp-file + rename writes
//! - `file_backend`: one JSON file per key in a directory
//! - `secret_storage`: read-only access to secret.json

pub mod atomic_file;
pub mod file_backend;
pub mod secret_storage;

pub use atomic_file::AtomicFile;
pub use file_backend::FileBackend;
pub use secret_storage::{SecretStorage, SecretStorageError};

use crate::paths::ParlorPaths;
use parlor_core::config::StorageConfig;
use parlor_core::storage::PersistentStore;
use std::sync::Arc;

/// Opens the persistent store described by `config`.
///
/// When the directory cannot be created or fails the write probe, an
/// unavailable store is returned instead so the application keeps running
/// without persistence.
pub fn open_persistent_store(config: &StorageConfig) -> PersistentStore {
    let dir = match config.dir.clone().map(Ok).unwrap_or_else(ParlorPaths::store_dir) {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "No store directory; persistence disabled");
            return PersistentStore::unavailable(e.to_string());
        }
    };

    let backend = match FileBackend::open(&dir) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to open store; persistence disabled");
            return PersistentStore::unavailable(e.to_string());
        }
    };

    let store = PersistentStore::new(Arc::new(backend), config.prefix.clone());
    if !store.is_available() {
        tracing::warn!(dir = %dir.display(), "Store failed write probe; persistence disabled");
        return PersistentStore::unavailable(format!("{} is not writable", dir.display()));
    }

    tracing::debug!(dir = %dir.display(), prefix = %config.prefix, "Opened persistent store");
    store
}

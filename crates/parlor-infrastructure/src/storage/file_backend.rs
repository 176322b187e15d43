//! Directory-backed storage medium.
//!
//! Each key is kept in its own `<key>.json` file inside one directory, so a
//! corrupted document never takes its neighbours down with it.

use super::atomic_file::AtomicFile;
use parlor_core::storage::{StorageBackend, StorageError};
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

/// A [`StorageBackend`] writing one atomic JSON file per key.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Opens (and creates if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> Result<AtomicFile, StorageError> {
        validate_key(key)?;
        Ok(AtomicFile::new(
            self.dir.join(format!("{}.{}", key, EXTENSION)),
        ))
    }
}

/// Keys become file names, so anything that could escape the directory or
/// collide with temp and lock files is refused.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid storage key: {:?}", key),
        )))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.file_for(key)?.read()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.file_for(key)?.write(value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.file_for(key)?.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::storage::{PersistentStore, SESSIONS_KEY};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path().join("store")).unwrap();

        backend.set("birthday_preferences", r#"{"preferredCharacter":"lawrence"}"#).unwrap();
        assert_eq!(
            backend.get("birthday_preferences").unwrap().as_deref(),
            Some(r#"{"preferredCharacter":"lawrence"}"#)
        );
        assert!(temp_dir.path().join("store/birthday_preferences.json").exists());

        backend.remove("birthday_preferences").unwrap();
        assert!(backend.get("birthday_preferences").unwrap().is_none());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).unwrap();

        assert!(backend.set("../escape", "1").is_err());
        assert!(backend.set("", "1").is_err());
        assert!(backend.get(".hidden").is_err());
    }

    #[test]
    fn test_probe_leaves_directory_clean() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).unwrap();

        backend.probe().unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_persistent_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("store");

        let store = PersistentStore::new(Arc::new(FileBackend::open(&dir).unwrap()), "birthday_");
        assert!(store.save(SESSIONS_KEY, &vec!["x".to_string()]));

        let reopened = PersistentStore::new(Arc::new(FileBackend::open(&dir).unwrap()), "birthday_");
        assert_eq!(
            reopened.load::<Vec<String>>(SESSIONS_KEY),
            Some(vec!["x".to_string()])
        );
    }
}

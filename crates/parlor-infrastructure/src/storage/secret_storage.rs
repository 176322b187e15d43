//! Secret configuration file storage.
//!
//! Loads API credentials from `~/.config/parlor/secret.json`.

use crate::paths::{ParlorPaths, write_secret_template};
use parlor_core::config::SecretConfig;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during secret storage operations.
#[derive(Error, Debug)]
pub enum SecretStorageError {
    /// Configuration file not found.
    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),
    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    /// Config directory not found.
    #[error("Could not determine home directory")]
    ConfigDirNotFound,
}

/// Storage for the secret configuration file (secret.json).
///
/// Read-only apart from writing the first-run template. Keys are never
/// validated or logged here.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a SecretStorage at the default path.
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = ParlorPaths::secret_file().map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a SecretStorage with a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the secret configuration from the JSON file.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Loads the secrets, writing a template and returning empty secrets on
    /// first run. Other failures are logged and also yield empty secrets.
    pub fn load_or_init(&self) -> SecretConfig {
        match self.load() {
            Ok(config) => config,
            Err(SecretStorageError::NotFound(path)) => {
                if let Err(e) = write_secret_template(&path) {
                    tracing::warn!(error = %e, "Failed to create secret template");
                }
                SecretConfig::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load secrets");
                SecretConfig::default()
            }
        }
    }

    /// Returns the path to the secret file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("secret.json");
        let storage = SecretStorage::with_path(file_path.clone());

        match storage.load() {
            Err(SecretStorageError::NotFound(path)) => assert_eq!(path, file_path),
            other => panic!("Expected NotFound error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_valid_json() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("secret.json");
        fs::write(
            &file_path,
            r#"{
                "default_api_key": "gsk_default",
                "credentials": { "groq": "gsk_test_key_123" }
            }"#,
        )
        .unwrap();

        let config = SecretStorage::with_path(file_path).load().unwrap();

        assert_eq!(config.default_api_key.as_deref(), Some("gsk_default"));
        assert_eq!(config.credentials["groq"], "gsk_test_key_123");
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("secret.json");
        fs::write(&file_path, "{ invalid json").unwrap();

        let result = SecretStorage::with_path(file_path).load();

        assert!(matches!(result, Err(SecretStorageError::ParseError(_))));
    }

    #[test]
    fn test_load_or_init_creates_template() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("secret.json");
        let storage = SecretStorage::with_path(file_path.clone());

        let config = storage.load_or_init();

        assert!(config.default_api_key.is_none());
        assert!(file_path.exists());
        assert!(storage.load().is_ok());
    }
}

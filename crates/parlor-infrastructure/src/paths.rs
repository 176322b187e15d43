//! Unified path management for parlor configuration and data files.
//!
//! ```text
//! ~/.config/parlor/            # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys
//! └── logs/                    # Application logs
//!     └── parlor.log.YYYY-MM-DD
//!
//! ~/.local/share/parlor/       # Data directory
//! └── store/                   # Persistent key/value store, one JSON file per key
//! ```

use parlor_core::config::SecretConfig;
use parlor_core::persona::get_default_presets;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

const APP_DIR: &str = "parlor";

/// Errors that can occur during path resolution.
#[derive(Error, Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

/// Unified path management for parlor.
pub struct ParlorPaths;

impl ParlorPaths {
    /// Returns the parlor configuration directory (e.g. `~/.config/parlor/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the parlor data directory (e.g. `~/.local/share/parlor/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to config.toml.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to secret.json.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the default directory of the persistent store.
    pub fn store_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("store"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }

    /// Ensures the secret file exists, creating a template if it doesn't.
    ///
    /// On Unix the new file is created with mode 600.
    pub fn ensure_secret_file() -> Result<PathBuf, std::io::Error> {
        let secret_path = Self::secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;
        write_secret_template(&secret_path)?;
        Ok(secret_path)
    }
}

/// Writes an empty credential template to `path` unless it already exists.
///
/// The template lists one entry per built-in persona selector.
///
/// Returns whether a template was written.
pub fn write_secret_template(path: &std::path::Path) -> Result<bool, std::io::Error> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let template = SecretConfig {
        default_api_key: Some(String::new()),
        credentials: get_default_presets()
            .into_iter()
            .map(|persona| (persona.credential, String::new()))
            .collect::<BTreeMap<_, _>>(),
    };
    let template_json = serde_json::to_string_pretty(&template).map_err(std::io::Error::other)?;

    std::fs::write(path, template_json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    tracing::info!(path = %path.display(), "Created secret template");
    Ok(true)
}

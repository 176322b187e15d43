//! Configuration service.
//!
//! Loads [`AppConfig`] from `~/.config/parlor/config.toml`.

use crate::paths::ParlorPaths;
use parlor_core::config::AppConfig;
use parlor_core::error::{ParlorError, Result};
use std::fs;
use std::path::PathBuf;

/// Loads the application configuration file.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
}

impl ConfigService {
    /// Creates a service reading the default config path.
    pub fn new() -> Self {
        Self {
            path: ParlorPaths::config_file().ok(),
        }
    }

    /// Creates a service reading `path`.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Reads and parses the config file.
    ///
    /// A missing file yields the default configuration.
    pub fn load(&self) -> Result<AppConfig> {
        let Some(path) = &self.path else {
            return Err(ParlorError::config("Could not determine config directory"));
        };

        if !path.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

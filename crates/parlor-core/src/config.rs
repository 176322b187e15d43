//! Configuration models.
//!
//! `AppConfig` is read from `config.toml`; `SecretConfig` from `secret.json`.
//! Both tolerate missing files and fields by falling back to defaults.

use crate::storage::DEFAULT_PREFIX;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default OpenAI-compatible chat completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable shared by every selector without a key of its own.
pub const FALLBACK_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Prefix of the per-selector environment variables.
pub const API_KEY_ENV_PREFIX: &str = "PARLOR_API_KEY_";

const PLACEHOLDER_MARKER: &str = "REPLACE_THIS";
const MIN_KEY_LEN: usize = 20;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote completion endpoint settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Stream replies by default
    #[serde(default)]
    pub stream: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            stream: false,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Store directory; the platform data dir is used when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            dir: None,
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Write a daily rolling log file
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: true,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// API credentials.
///
/// Never log or display the values held here.
#[derive(Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SecretConfig {
    /// Key used for any selector without its own entry
    #[serde(default)]
    pub default_api_key: Option<String>,
    /// Credential selector to API key
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

impl SecretConfig {
    /// Resolves the key for `selector`, consulting the process environment.
    pub fn resolve(&self, selector: &str) -> Option<String> {
        self.resolve_with(selector, |name| std::env::var(name).ok())
    }

    /// Resolves the key for `selector` using `env` for variable lookup.
    ///
    /// Order: `PARLOR_API_KEY_<SELECTOR>`, the selector's entry in
    /// `credentials`, `GROQ_API_KEY`, then `default_api_key`. Empty values
    /// are skipped.
    pub fn resolve_with<F>(&self, selector: &str, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        non_empty(env(&selector_env_var(selector)))
            .or_else(|| non_empty(self.credentials.get(selector).cloned()))
            .or_else(|| non_empty(env(FALLBACK_API_KEY_ENV)))
            .or_else(|| non_empty(self.default_api_key.clone()))
    }
}

impl std::fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretConfig")
            .field("default_api_key", &self.default_api_key.as_ref().map(|_| "<redacted>"))
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Environment variable name for a credential selector.
pub fn selector_env_var(selector: &str) -> String {
    format!(
        "{}{}",
        API_KEY_ENV_PREFIX,
        selector.to_uppercase().replace('-', "_")
    )
}

/// Returns whether `key` looks like a real API key rather than a placeholder.
pub fn is_key_configured(key: &str) -> bool {
    key.len() > MIN_KEY_LEN && !key.contains(PLACEHOLDER_MARKER)
}

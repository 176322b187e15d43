//! Infrastructure layer: file-backed storage, platform paths and
//! configuration loading.

pub mod config_service;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::paths::ParlorPaths;
pub use crate::storage::{FileBackend, SecretStorage, open_persistent_store};

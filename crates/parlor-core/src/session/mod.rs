//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`MessageRole`, `Message`)
//! - `model`: Sessions, per-character threads and the persisted document
//! - `migration`: Lifting the legacy flat history into sessions
//! - `manager`: Session lifecycle management (`SessionStore`)

mod manager;
mod message;
mod migration;
mod model;

#[cfg(test)]
mod manager_test;

pub use manager::SessionStore;
pub use message::{Message, MessageRole};
pub use migration::{MigrationOutcome, migrate_legacy_history};
pub use model::{
    CharacterThread, DEFAULT_SESSION_NAME, LegacyHistory, Session, SessionDocument,
    SessionSummary, generate_session_id, now_millis,
};

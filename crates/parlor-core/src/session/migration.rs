//! Legacy history migration.
//!
//! Before sessions existed every character had one flat message list stored
//! under the legacy history key. Migration lifts each non-empty list into a
//! single `"Main Chat"` session, but only for characters that do not already
//! own a thread.

use super::model::{CharacterThread, DEFAULT_SESSION_NAME, LegacyHistory, Session, SessionDocument};

/// Result of migrating a legacy history into a session document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// The document after migration.
    pub document: SessionDocument,
    /// Character ids that received a migrated thread.
    pub migrated: Vec<String>,
}

/// Merges `legacy` into `current` without touching existing threads.
///
/// Running it again on its own output migrates nothing.
pub fn migrate_legacy_history(legacy: &LegacyHistory, current: &SessionDocument) -> MigrationOutcome {
    let mut document = current.clone();
    let mut migrated = Vec::new();

    for (character_id, messages) in legacy {
        if messages.is_empty() || document.threads.contains_key(character_id) {
            continue;
        }

        let session = Session::with_messages(DEFAULT_SESSION_NAME, messages.clone());
        document
            .threads
            .insert(character_id.clone(), CharacterThread::with_session(session));
        migrated.push(character_id.clone());
    }

    MigrationOutcome { document, migrated }
}

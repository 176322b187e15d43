use super::message::Message;
use super::migration::{MigrationOutcome, migrate_legacy_history};
use super::model::{
    CharacterThread, DEFAULT_SESSION_NAME, LegacyHistory, Session, SessionDocument,
    SessionSummary, generate_session_id,
};
use crate::error::{ParlorError, Result};
use crate::storage::{LEGACY_HISTORY_KEY, PersistentStore, SESSIONS_KEY};

/// Owns every character's session thread and keeps them persisted.
///
/// `SessionStore` is responsible for:
/// - Creating threads lazily with a default session
/// - Appending messages to the active session
/// - Creating, switching, renaming and deleting sessions
/// - Migrating the legacy flat history
///
/// The in-memory document is authoritative. Every mutation is followed by a
/// best-effort write of the whole document; a failed write is logged and the
/// mutation stays in memory.
#[derive(Debug)]
pub struct SessionStore {
    store: PersistentStore,
    document: SessionDocument,
}

impl SessionStore {
    /// Loads the session document from `store`, repairing broken threads.
    pub fn load(store: PersistentStore) -> Self {
        let document = store.load_or(SESSIONS_KEY, SessionDocument::new());
        Self::from_document(store, document)
    }

    /// Creates a store over an already loaded document.
    pub fn from_document(store: PersistentStore, mut document: SessionDocument) -> Self {
        let healed = document.heal();
        for character_id in &healed {
            tracing::warn!(character_id = %character_id, "Repaired session thread on load");
        }

        let session_store = Self { store, document };
        if !healed.is_empty() {
            session_store.persist();
        }
        session_store
    }

    /// The current in-memory document.
    pub fn document(&self) -> &SessionDocument {
        &self.document
    }

    fn persist(&self) -> bool {
        self.store.save(SESSIONS_KEY, &self.document)
    }

    /// Re-persists the whole document.
    pub fn flush(&self) -> bool {
        self.persist()
    }

    /// Returns the thread for `character_id`, creating it if needed.
    ///
    /// A new thread holds one empty `"Main Chat"` session and is persisted
    /// immediately.
    pub fn get_or_create_thread(&mut self, character_id: &str) -> &CharacterThread {
        self.thread_mut(character_id)
    }

    fn thread_mut(&mut self, character_id: &str) -> &mut CharacterThread {
        let changed = match self.document.threads.get_mut(character_id) {
            Some(thread) => {
                let healed = thread.heal();
                if healed {
                    tracing::warn!(character_id, "Repaired session thread");
                }
                healed
            }
            None => {
                tracing::debug!(character_id, "Creating session thread");
                self.document
                    .threads
                    .insert(character_id.to_string(), CharacterThread::new());
                true
            }
        };

        if changed {
            self.persist();
        }

        self.document
            .threads
            .entry(character_id.to_string())
            .or_default()
    }

    fn existing_thread_mut(
        &mut self,
        character_id: &str,
        session_id: &str,
    ) -> Result<&mut CharacterThread> {
        match self.document.threads.get_mut(character_id) {
            Some(thread) if thread.sessions.contains_key(session_id) => Ok(thread),
            _ => Err(ParlorError::invalid_session(character_id, session_id)),
        }
    }

    /// Messages of the active session of `character_id`.
    pub fn active_messages(&mut self, character_id: &str) -> &[Message] {
        self.thread_mut(character_id)
            .active()
            .map(|session| session.messages.as_slice())
            .unwrap_or_default()
    }

    /// Appends `message` to the active session and persists.
    pub fn append_message(&mut self, character_id: &str, message: Message) {
        let thread = self.thread_mut(character_id);
        if let Some(session) = thread.active_mut() {
            session.messages.push(message);
        }
        tracing::debug!(character_id, "Appended message to active session");
        self.persist();
    }

    /// Creates a new empty session and returns its id.
    ///
    /// The active session is left unchanged.
    pub fn create_session(&mut self, character_id: &str, name: &str) -> String {
        let session_id = generate_session_id();
        self.thread_mut(character_id)
            .sessions
            .insert(session_id.clone(), Session::new(name));
        tracing::debug!(character_id, session_id = %session_id, "Created session");
        self.persist();
        session_id
    }

    /// Makes `session_id` the active session of `character_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::InvalidSession`] if the id is not in the
    /// thread; the active pointer is left unchanged.
    pub fn switch_active_session(&mut self, character_id: &str, session_id: &str) -> Result<()> {
        let thread = self.existing_thread_mut(character_id, session_id)?;
        thread.active_session = session_id.to_string();
        tracing::debug!(character_id, session_id, "Switched active session");
        self.persist();
        Ok(())
    }

    /// Renames a session.
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::InvalidSession`] if the id is not in the thread.
    pub fn rename_session(
        &mut self,
        character_id: &str,
        session_id: &str,
        new_name: &str,
    ) -> Result<()> {
        let thread = self.existing_thread_mut(character_id, session_id)?;
        if let Some(session) = thread.sessions.get_mut(session_id) {
            session.name = new_name.to_string();
        }
        tracing::debug!(character_id, session_id, "Renamed session");
        self.persist();
        Ok(())
    }

    /// Deletes a session.
    ///
    /// Deleting the active session promotes the earliest created remaining
    /// session. Deleting the last session replaces it with a fresh
    /// `"Main Chat"`.
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::InvalidSession`] if the id is not in the thread.
    pub fn delete_session(&mut self, character_id: &str, session_id: &str) -> Result<()> {
        let thread = self.existing_thread_mut(character_id, session_id)?;
        thread.sessions.remove(session_id);

        if thread.active_session == session_id {
            match thread.earliest_session_id() {
                Some(next) => thread.active_session = next,
                None => *thread = CharacterThread::new(),
            }
        }

        tracing::debug!(character_id, session_id, "Deleted session");
        self.persist();
        Ok(())
    }

    /// Replaces the thread of `character_id` with one empty default session.
    pub fn reset_thread(&mut self, character_id: &str) -> &CharacterThread {
        self.document
            .threads
            .insert(character_id.to_string(), CharacterThread::new());
        tracing::debug!(character_id, "Reset session thread");
        self.persist();
        self.thread_mut(character_id)
    }

    /// Summaries of every session of `character_id`, oldest first.
    pub fn list_sessions(&mut self, character_id: &str) -> Vec<SessionSummary> {
        let thread = self.thread_mut(character_id);
        let mut summaries: Vec<SessionSummary> = thread
            .sessions
            .iter()
            .map(|(id, session)| {
                SessionSummary::from_session(id, session, *id == thread.active_session)
            })
            .collect();
        summaries.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    /// Summary of the active session of `character_id`.
    pub fn active_session(&mut self, character_id: &str) -> SessionSummary {
        let thread = self.thread_mut(character_id);
        let id = thread.active_session.clone();
        match thread.active() {
            Some(session) => SessionSummary::from_session(&id, session, true),
            None => SessionSummary::from_session(&id, &Session::new(DEFAULT_SESSION_NAME), true),
        }
    }

    /// Merges a legacy flat history into the document.
    ///
    /// Characters that already own a thread are left alone. The document is
    /// persisted once, and only if something was migrated.
    pub fn migrate_legacy_history(&mut self, legacy: &LegacyHistory) -> Vec<String> {
        let MigrationOutcome { document, migrated } = migrate_legacy_history(legacy, &self.document);
        if migrated.is_empty() {
            return migrated;
        }

        self.document = document;
        tracing::info!(count = migrated.len(), "Migrated legacy chat history");
        self.persist();
        migrated
    }

    /// Loads the legacy history from the store and migrates it.
    pub fn migrate_from_store(&mut self) -> Vec<String> {
        let legacy: LegacyHistory = self.store.load_or(LEGACY_HISTORY_KEY, LegacyHistory::new());
        self.migrate_legacy_history(&legacy)
    }
}

//! Session domain models.
//!
//! The persisted layout is one [`SessionDocument`] mapping each character id
//! to a [`CharacterThread`]; each thread holds named [`Session`]s and a
//! pointer to the active one.

use super::message::Message;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name given to the first session of every thread.
pub const DEFAULT_SESSION_NAME: &str = "Main Chat";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Flat per-character history written before sessions existed.
pub type LegacyHistory = BTreeMap<String, Vec<Message>>;

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generates a session id of the form `session_<millis>_<9 base36 chars>`.
///
/// Ids are unique in practice but not meant to be unguessable.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("session_{}_{}", now_millis(), suffix)
}

/// A named conversation with one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    /// Append-only message log
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time in Unix milliseconds
    #[serde(default)]
    pub created: i64,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_messages(name, Vec::new())
    }

    pub fn with_messages(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            created: now_millis(),
        }
    }

    /// Content of the last message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// All sessions belonging to one character plus the active pointer.
///
/// Once initialized a thread always has at least one session and
/// `active_session` always names one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterThread {
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    #[serde(default)]
    pub active_session: String,
}

impl CharacterThread {
    /// Creates a thread with a single empty default session.
    pub fn new() -> Self {
        Self::with_session(Session::new(DEFAULT_SESSION_NAME))
    }

    /// Creates a thread whose only session is `session`.
    pub fn with_session(session: Session) -> Self {
        let id = generate_session_id();
        let mut sessions = BTreeMap::new();
        sessions.insert(id.clone(), session);
        Self {
            sessions,
            active_session: id,
        }
    }

    /// The active session.
    ///
    /// Returns `None` only for a thread that violates its invariant; see
    /// [`CharacterThread::heal`].
    pub fn active(&self) -> Option<&Session> {
        self.sessions.get(&self.active_session)
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        self.sessions.get_mut(&self.active_session)
    }

    /// Id of the session to promote when the active one goes away:
    /// the earliest created, ties broken by id.
    pub fn earliest_session_id(&self) -> Option<String> {
        self.sessions
            .iter()
            .min_by(|(a_id, a), (b_id, b)| a.created.cmp(&b.created).then_with(|| a_id.cmp(b_id)))
            .map(|(id, _)| id.clone())
    }

    /// Restores the thread invariant in place.
    ///
    /// An empty thread gets a fresh default session and a dangling active
    /// pointer is moved to the earliest session. Returns whether anything
    /// was repaired.
    pub fn heal(&mut self) -> bool {
        if self.sessions.is_empty() {
            *self = Self::new();
            return true;
        }
        if self.sessions.contains_key(&self.active_session) {
            return false;
        }
        match self.earliest_session_id() {
            Some(id) => {
                self.active_session = id;
                true
            }
            None => false,
        }
    }
}

impl Default for CharacterThread {
    fn default() -> Self {
        Self::new()
    }
}

/// The whole persisted chat state: character id to thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDocument {
    pub threads: BTreeMap<String, CharacterThread>,
}

impl SessionDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn get(&self, character_id: &str) -> Option<&CharacterThread> {
        self.threads.get(character_id)
    }

    /// Heals every thread and returns the ids of the repaired characters.
    pub fn heal(&mut self) -> Vec<String> {
        self.threads
            .iter_mut()
            .filter_map(|(id, thread)| thread.heal().then(|| id.clone()))
            .collect()
    }
}

/// A row of the session picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub message_count: usize,
    pub created: i64,
    pub is_active: bool,
    /// First 60 characters of the last message
    pub preview: String,
}

const PREVIEW_LEN: usize = 60;
const EMPTY_PREVIEW: &str = "No messages yet";

impl SessionSummary {
    pub fn from_session(id: &str, session: &Session, is_active: bool) -> Self {
        let preview = match session.last_message() {
            Some(message) => {
                let mut preview: String = message.content.chars().take(PREVIEW_LEN).collect();
                if message.content.chars().count() > PREVIEW_LEN {
                    preview.push_str("...");
                }
                preview
            }
            None => EMPTY_PREVIEW.to_string(),
        };

        Self {
            id: id.to_string(),
            name: session.name.clone(),
            message_count: session.messages.len(),
            created: session.created,
            is_active,
            preview,
        }
    }
}

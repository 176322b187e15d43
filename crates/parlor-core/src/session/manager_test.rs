#[cfg(test)]
mod tests {
    use crate::session::manager::SessionStore;
    use crate::session::message::{Message, MessageRole};
    use crate::session::model::{CharacterThread, LegacyHistory, Session, SessionDocument};
    use crate::storage::{
        LEGACY_HISTORY_KEY, MemoryBackend, PersistentStore, SESSIONS_KEY, StorageBackend,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const CHAR: &str = "character-a";

    fn memory_store() -> (Arc<MemoryBackend>, PersistentStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = PersistentStore::new(backend.clone(), "test_");
        (backend, store)
    }

    fn session_at(name: &str, created: i64) -> Session {
        Session {
            name: name.to_string(),
            messages: Vec::new(),
            created,
        }
    }

    /// Thread with sessions "s1" (active, oldest), "s2" and "s3".
    fn three_session_store() -> SessionStore {
        let mut sessions = BTreeMap::new();
        sessions.insert("s1".to_string(), session_at("Main Chat", 100));
        sessions.insert("s3".to_string(), session_at("Third", 300));
        sessions.insert("s2".to_string(), session_at("Second", 200));
        let mut document = SessionDocument::new();
        document.threads.insert(
            CHAR.to_string(),
            CharacterThread {
                sessions,
                active_session: "s1".to_string(),
            },
        );
        SessionStore::from_document(PersistentStore::in_memory(), document)
    }

    #[test]
    fn test_get_or_create_thread_has_active_session() {
        let (_backend, store) = memory_store();
        let mut sessions = SessionStore::load(store.clone());

        let thread = sessions.get_or_create_thread(CHAR);
        assert_eq!(thread.sessions.len(), 1);
        let active = thread.active().expect("active session exists");
        assert_eq!(active.name, "Main Chat");
        assert!(active.messages.is_empty());

        let persisted: SessionDocument = store.load(SESSIONS_KEY).unwrap();
        assert!(persisted.get(CHAR).is_some());
    }

    #[test]
    fn test_get_or_create_thread_is_stable() {
        let mut sessions = SessionStore::load(PersistentStore::in_memory());
        let first = sessions.get_or_create_thread(CHAR).active_session.clone();
        let second = sessions.get_or_create_thread(CHAR).active_session.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_append_message_goes_to_active_session() {
        let mut sessions = SessionStore::load(PersistentStore::in_memory());
        let other = sessions.create_session(CHAR, "Other");

        sessions.append_message(CHAR, Message::user("hi"));

        assert_eq!(sessions.active_messages(CHAR), &[Message::user("hi")]);
        let thread = sessions.get_or_create_thread(CHAR);
        assert!(thread.sessions[&other].messages.is_empty());
    }

    #[test]
    fn test_create_session_leaves_active_pointer() {
        let mut sessions = SessionStore::load(PersistentStore::in_memory());
        let active = sessions.get_or_create_thread(CHAR).active_session.clone();

        let created = sessions.create_session(CHAR, "Untitled Chat");

        let thread = sessions.get_or_create_thread(CHAR);
        assert_eq!(thread.active_session, active);
        assert_eq!(thread.sessions[&created].name, "Untitled Chat");
        assert_eq!(thread.sessions.len(), 2);
    }

    #[test]
    fn test_switch_to_unknown_session_fails() {
        let mut sessions = SessionStore::load(PersistentStore::in_memory());
        let active = sessions.get_or_create_thread(CHAR).active_session.clone();

        let err = sessions.switch_active_session(CHAR, "zzz").unwrap_err();

        assert!(err.is_invalid_session());
        assert_eq!(sessions.get_or_create_thread(CHAR).active_session, active);
    }

    #[test]
    fn test_switch_for_character_without_thread_fails() {
        let mut sessions = SessionStore::load(PersistentStore::in_memory());
        let err = sessions.switch_active_session("character-b", "s1").unwrap_err();
        assert!(err.is_invalid_session());
        assert!(sessions.document().get("character-b").is_none());
    }

    #[test]
    fn test_switch_changes_active_messages() {
        let mut sessions = SessionStore::load(PersistentStore::in_memory());
        sessions.append_message(CHAR, Message::user("first"));
        let second = sessions.create_session(CHAR, "Second");

        sessions.switch_active_session(CHAR, &second).unwrap();

        assert!(sessions.active_messages(CHAR).is_empty());
    }

    #[test]
    fn test_rename_session() {
        let mut store = three_session_store();

        store.rename_session(CHAR, "s2", "Renamed").unwrap();
        assert_eq!(store.document().get(CHAR).unwrap().sessions["s2"].name, "Renamed");

        assert!(store.rename_session(CHAR, "nope", "x").unwrap_err().is_invalid_session());
    }

    #[test]
    fn test_delete_inactive_session_keeps_pointer() {
        let mut store = three_session_store();

        store.delete_session(CHAR, "s3").unwrap();

        let thread = store.document().get(CHAR).unwrap();
        assert_eq!(thread.active_session, "s1");
        assert_eq!(thread.sessions.len(), 2);
    }

    #[test]
    fn test_delete_active_promotes_earliest_created() {
        let mut store = three_session_store();

        store.delete_session(CHAR, "s1").unwrap();

        let thread = store.document().get(CHAR).unwrap();
        assert_eq!(thread.active_session, "s2");
        assert!(thread.active().is_some());
    }

    #[test]
    fn test_delete_only_session_synthesizes_main_chat() {
        let mut sessions = SessionStore::load(PersistentStore::in_memory());
        let only = sessions.get_or_create_thread(CHAR).active_session.clone();

        sessions.delete_session(CHAR, &only).unwrap();

        let thread = sessions.get_or_create_thread(CHAR);
        assert_eq!(thread.sessions.len(), 1);
        assert_ne!(thread.active_session, only);
        assert_eq!(thread.active().unwrap().name, "Main Chat");
        assert!(thread.active().unwrap().messages.is_empty());
    }

    #[test]
    fn test_delete_never_leaves_zero_sessions() {
        let mut store = three_session_store();
        for _ in 0..5 {
            let active = store.document().get(CHAR).unwrap().active_session.clone();
            store.delete_session(CHAR, &active).unwrap();

            let thread = store.document().get(CHAR).unwrap();
            assert!(!thread.sessions.is_empty());
            assert!(thread.sessions.contains_key(&thread.active_session));
        }
    }

    #[test]
    fn test_delete_unknown_session_fails() {
        let mut store = three_session_store();
        let before = store.document().clone();

        assert!(store.delete_session(CHAR, "zzz").unwrap_err().is_invalid_session());
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn test_reset_thread() {
        let mut store = three_session_store();

        let thread = store.reset_thread(CHAR);

        assert_eq!(thread.sessions.len(), 1);
        assert_eq!(thread.active().unwrap().name, "Main Chat");
    }

    #[test]
    fn test_list_sessions_ordered_by_creation() {
        let mut store = three_session_store();

        let summaries = store.list_sessions(CHAR);

        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert!(summaries[0].is_active);
        assert!(!summaries[1].is_active);
        assert_eq!(summaries[2].preview, "No messages yet");
    }

    #[test]
    fn test_active_session_summary() {
        let mut store = three_session_store();
        store.switch_active_session(CHAR, "s3").unwrap();

        let active = store.active_session(CHAR);

        assert_eq!(active.id, "s3");
        assert_eq!(active.name, "Third");
        assert!(active.is_active);
    }

    #[test]
    fn test_thread_roundtrips_through_store() {
        let (backend, store) = memory_store();
        let mut sessions = SessionStore::load(store.clone());
        sessions.append_message(CHAR, Message::user("hello"));
        sessions.append_message(CHAR, Message::assistant("...hi"));
        sessions.create_session(CHAR, "Second");

        let reloaded = SessionStore::load(PersistentStore::new(backend, "test_"));

        assert_eq!(reloaded.document(), sessions.document());
    }

    #[test]
    fn test_load_heals_broken_document() {
        let (backend, store) = memory_store();
        backend
            .set(
                "test_chat_sessions",
                r#"{
                    "character-a": {"sessions": {}, "activeSession": "gone"},
                    "character-b": {
                        "sessions": {"s9": {"name": "Kept", "messages": [], "created": 5}},
                        "activeSession": "missing"
                    }
                }"#,
            )
            .unwrap();

        let sessions = SessionStore::load(store);

        let a = sessions.document().get("character-a").unwrap();
        assert_eq!(a.sessions.len(), 1);
        assert!(a.active().is_some());
        let b = sessions.document().get("character-b").unwrap();
        assert_eq!(b.active_session, "s9");
    }

    #[test]
    fn test_persistence_failure_keeps_memory_state() {
        let mut sessions = SessionStore::load(PersistentStore::unavailable("quota exceeded"));

        sessions.append_message(CHAR, Message::user("still here"));

        assert_eq!(sessions.active_messages(CHAR).len(), 1);
        assert!(!sessions.flush());
    }

    #[test]
    fn test_migrate_legacy_history_from_store() {
        let (_backend, store) = memory_store();
        let mut legacy = LegacyHistory::new();
        legacy.insert(
            CHAR.to_string(),
            vec![Message::user("old"), Message::assistant("reply")],
        );
        store.save(LEGACY_HISTORY_KEY, &legacy);

        let mut sessions = SessionStore::load(store.clone());
        let migrated = sessions.migrate_from_store();

        assert_eq!(migrated, vec![CHAR.to_string()]);
        let messages = sessions.active_messages(CHAR);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Assistant);

        let persisted: SessionDocument = store.load(SESSIONS_KEY).unwrap();
        assert_eq!(&persisted, sessions.document());
    }

    #[test]
    fn test_migrate_twice_changes_nothing() {
        let mut legacy = LegacyHistory::new();
        legacy.insert(CHAR.to_string(), vec![Message::user("old")]);
        let mut sessions = SessionStore::load(PersistentStore::in_memory());

        sessions.migrate_legacy_history(&legacy);
        let after_first = sessions.document().clone();
        let second = sessions.migrate_legacy_history(&legacy);

        assert!(second.is_empty());
        assert_eq!(sessions.document(), &after_first);
    }

    #[test]
    fn test_migrate_skips_when_nothing_to_do() {
        let (backend, store) = memory_store();
        let mut sessions = SessionStore::load(store);

        let migrated = sessions.migrate_legacy_history(&LegacyHistory::new());

        assert!(migrated.is_empty());
        assert!(backend.get("test_chat_sessions").unwrap().is_none());
    }
}

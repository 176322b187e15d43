//! Application state and its lifecycle.
//!
//! Built once at startup by [`AppState::initialize`]: opens the persistent
//! store, loads the session document, migrates the legacy flat history and
//! restores the preferred character. Mutated only through the orchestrator
//! and the session store; flushed by [`AppState::shutdown`].

use crate::conversation::ConversationOrchestrator;
use anyhow::{Context, Result};
use parlor_core::config::{AppConfig, SecretConfig};
use parlor_core::persona::{CharacterRegistry, StaticRegistry};
use parlor_core::session::SessionStore;
use parlor_core::storage::PersistentStore;
use parlor_infrastructure::open_persistent_store;
use parlor_interaction::{CompletionBackend, CompletionClient, HttpCompletionBackend};
use std::sync::Arc;

pub struct AppState {
    config: AppConfig,
    store: PersistentStore,
    orchestrator: Arc<ConversationOrchestrator>,
}

impl AppState {
    /// Wires the production stack from `config` and `secrets`.
    pub async fn initialize(config: AppConfig, secrets: SecretConfig) -> Result<Self> {
        let store = open_persistent_store(&config.storage);
        let backend = HttpCompletionBackend::new(&config.api, secrets)
            .context("Failed to build HTTP client")?;

        Ok(Self::with_parts(
            config,
            store,
            Arc::new(StaticRegistry::with_presets()),
            Arc::new(backend),
        )
        .await)
    }

    /// Wires the state from explicit parts.
    pub async fn with_parts(
        config: AppConfig,
        store: PersistentStore,
        registry: Arc<dyn CharacterRegistry>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        let mut sessions = SessionStore::load(store.clone());
        let migrated = sessions.migrate_from_store();
        if !migrated.is_empty() {
            tracing::info!(characters = ?migrated, "Legacy chat history migrated into sessions");
        }

        let orchestrator = ConversationOrchestrator::new(
            registry,
            CompletionClient::new(backend),
            sessions,
            store.clone(),
        );
        if let Some(persona) = orchestrator.restore_preferred_character().await {
            tracing::info!(character_id = %persona.id, "Resuming with preferred character");
        }

        tracing::info!(persistent = store.is_available(), "Application state initialized");
        Self {
            config,
            store,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<ConversationOrchestrator> {
        &self.orchestrator
    }

    /// Flushes the session document. Returns `false` if the write failed.
    pub async fn shutdown(&self) -> bool {
        let flushed = self.orchestrator.sessions().lock().await.flush();
        if flushed {
            tracing::info!("Session document flushed");
        } else {
            tracing::warn!("Failed to flush session document on shutdown");
        }
        flushed
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

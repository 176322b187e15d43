//! Conversation orchestrator.
//!
//! Runs one exchange at a time: validates the input, commits the user
//! message, shapes the request (token budget and continuity annotation),
//! calls the completion client and commits the reply.
//!
//! # Exchange lifecycle
//!
//! 1. Reject blank input, unknown characters and concurrent exchanges
//!    without touching any state.
//! 2. Append the user message to the active session.
//! 3. Call the model. The session store is not locked during the call.
//! 4. On success append the assistant reply; on failure return the apology
//!    and leave the user message alone.

use crate::budget::token_budget;
use crate::continuity::annotate_prompt;
use crate::greeting::{Greeting, greeting_request};
use futures::{Stream, StreamExt};
use parlor_core::error::{ParlorError, Result};
use parlor_core::persona::{CharacterRegistry, Persona};
use parlor_core::session::{Message, SessionStore};
use parlor_core::storage::PersistentStore;
use parlor_interaction::{
    ChatRequest, CompletionClient, CompletionFailure, CompletionReply, CompletionStream,
    StreamEvent,
};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Reply used when the model returns nothing and the persona has no
/// fallback lines.
pub const CONNECTION_TROUBLE: &str =
    "I apologize, but I'm having trouble connecting right now. Please try again.";

/// Why an exchange was refused before anything was committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("message is empty")]
    EmptyInput,

    #[error("another message is still being answered")]
    Busy,

    #[error("no character selected")]
    NoCharacter,

    #[error("unknown character '{0}'")]
    UnknownCharacter(String),
}

/// Result of a one-shot exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The reply was committed as an assistant message.
    Replied(String),
    /// The model could not be reached; only the user message was committed.
    Failed {
        failure: CompletionFailure,
        apology: String,
    },
    /// The streamed reply was cancelled; only the user message was committed.
    Cancelled,
    /// Nothing was committed.
    Rejected(RejectReason),
}

impl ExchangeOutcome {
    /// Text to show for this outcome, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Replied(text) => Some(text),
            Self::Failed { apology, .. } => Some(apology),
            Self::Cancelled | Self::Rejected(_) => None,
        }
    }

    pub fn is_replied(&self) -> bool {
        matches!(self, Self::Replied(_))
    }
}

/// Holds the global busy flag for as long as it lives.
#[derive(Debug)]
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A validated exchange whose user message is already committed.
struct PreparedExchange {
    persona: Persona,
    request: ChatRequest,
    guard: BusyGuard,
}

/// Builds the request for `message` following `history`.
///
/// The persona's sampling parameters are kept except for `max_tokens`,
/// which is replaced by the budget for this message only.
pub fn build_request(persona: &Persona, history: &[Message], message: &str) -> ChatRequest {
    let max_tokens = token_budget(message, persona.max_tokens_ceiling());
    ChatRequest {
        system_prompt: annotate_prompt(&persona.system_prompt, history.len(), message),
        history: history.to_vec(),
        user_message: message.to_string(),
        model: persona.model.clone(),
        params: persona.params.with_max_tokens(max_tokens),
        credential: persona.credential.clone(),
    }
}

fn reply_or_fallback(persona: &Persona, text: String) -> String {
    if !text.trim().is_empty() {
        return text;
    }
    tracing::warn!(character_id = %persona.id, "Model returned an empty reply, using fallback line");
    persona
        .random_fallback_response()
        .unwrap_or(CONNECTION_TROUBLE)
        .to_string()
}

/// Coordinates the registry, the session store and the completion client.
pub struct ConversationOrchestrator {
    registry: Arc<dyn CharacterRegistry>,
    client: CompletionClient,
    sessions: Arc<Mutex<SessionStore>>,
    store: PersistentStore,
    busy: Arc<AtomicBool>,
    current_character: RwLock<Option<String>>,
}

impl ConversationOrchestrator {
    pub fn new(
        registry: Arc<dyn CharacterRegistry>,
        client: CompletionClient,
        sessions: SessionStore,
        store: PersistentStore,
    ) -> Self {
        Self {
            registry,
            client,
            sessions: Arc::new(Mutex::new(sessions)),
            store,
            busy: Arc::new(AtomicBool::new(false)),
            current_character: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<dyn CharacterRegistry> {
        &self.registry
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    /// The session store, for session management from the UI.
    pub fn sessions(&self) -> &Arc<Mutex<SessionStore>> {
        &self.sessions
    }

    /// Whether an exchange is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn persona(&self, character_id: &str) -> std::result::Result<Persona, RejectReason> {
        self.registry
            .get(character_id)
            .cloned()
            .ok_or_else(|| RejectReason::UnknownCharacter(character_id.to_string()))
    }

    // ============================================================================
    // Character selection
    // ============================================================================

    /// Makes `character_id` the current character and remembers it as the
    /// preferred one.
    ///
    /// # Errors
    ///
    /// Returns [`ParlorError::NotFound`] for an id the registry does not know.
    pub async fn select_character(&self, character_id: &str) -> Result<Persona> {
        let persona = self
            .registry
            .get(character_id)
            .cloned()
            .ok_or_else(|| ParlorError::not_found("character", character_id))?;

        *self.current_character.write().await = Some(persona.id.clone());
        self.sessions.lock().await.get_or_create_thread(&persona.id);

        let mut preferences = self.store.load_preferences();
        preferences.preferred_character = Some(persona.id.clone());
        if !self.store.save_preferences(&preferences) {
            tracing::warn!(character_id, "Failed to remember preferred character");
        }

        tracing::info!(character_id, "Selected character");
        Ok(persona)
    }

    /// Restores the preferred character saved by an earlier run.
    ///
    /// Unknown or missing preferences leave the selection empty.
    pub async fn restore_preferred_character(&self) -> Option<Persona> {
        let preferred = self.store.load_preferences().preferred_character?;
        let persona = self.registry.get(&preferred).cloned()?;
        *self.current_character.write().await = Some(persona.id.clone());
        tracing::debug!(character_id = %persona.id, "Restored preferred character");
        Some(persona)
    }

    /// The currently selected character.
    pub async fn current_character(&self) -> Option<Persona> {
        let current = self.current_character.read().await;
        current.as_deref().and_then(|id| self.registry.get(id)).cloned()
    }

    // ============================================================================
    // Exchanges
    // ============================================================================

    async fn prepare(
        &self,
        input: &str,
        character_id: &str,
    ) -> std::result::Result<PreparedExchange, RejectReason> {
        let message = input.trim();
        if message.is_empty() {
            return Err(RejectReason::EmptyInput);
        }
        let persona = self.persona(character_id)?;
        let guard = BusyGuard::acquire(&self.busy).ok_or(RejectReason::Busy)?;

        let request = {
            let mut sessions = self.sessions.lock().await;
            let history = sessions.active_messages(character_id).to_vec();
            sessions.append_message(character_id, Message::user(message));
            build_request(&persona, &history, message)
        };

        tracing::info!(
            character_id,
            model = %persona.model,
            max_tokens = request.params.max_tokens_or_default(),
            prior_messages = request.history.len(),
            "Dispatching exchange"
        );

        Ok(PreparedExchange {
            persona,
            request,
            guard,
        })
    }

    /// Sends `input` to `character_id` and waits for the whole reply.
    pub async fn send(&self, input: &str, character_id: &str) -> ExchangeOutcome {
        let PreparedExchange {
            persona,
            request,
            guard,
        } = match self.prepare(input, character_id).await {
            Ok(prepared) => prepared,
            Err(reason) => {
                tracing::debug!(character_id, reason = %reason, "Exchange rejected");
                return ExchangeOutcome::Rejected(reason);
            }
        };

        let outcome = match self.client.complete(&request).await {
            CompletionReply::Generated(text) => {
                let reply = reply_or_fallback(&persona, text);
                self.sessions
                    .lock()
                    .await
                    .append_message(character_id, Message::assistant(reply.clone()));
                ExchangeOutcome::Replied(reply)
            }
            CompletionReply::Fallback { failure, text } => {
                tracing::warn!(character_id, kind = failure.kind(), "Exchange failed");
                ExchangeOutcome::Failed {
                    failure,
                    apology: text,
                }
            }
        };

        drop(guard);
        outcome
    }

    /// Sends `input` to the current character.
    pub async fn send_to_current(&self, input: &str) -> ExchangeOutcome {
        let current = self.current_character.read().await.clone();
        match current {
            Some(character_id) => self.send(input, &character_id).await,
            None => ExchangeOutcome::Rejected(RejectReason::NoCharacter),
        }
    }

    /// Sends `input` to `character_id` and streams the reply.
    ///
    /// The user message is committed before this returns. The reply is
    /// committed once the stream ends normally; a failed or cancelled stream
    /// commits nothing. The busy flag is held until the stream ends or is
    /// dropped.
    pub async fn send_streaming(
        &self,
        input: &str,
        character_id: &str,
    ) -> std::result::Result<ExchangeStream, RejectReason> {
        let prepared = self.prepare(input, character_id).await.inspect_err(|reason| {
            tracing::debug!(character_id, reason = %reason, "Exchange rejected");
        })?;
        let completion = self.client.stream(&prepared.request);
        Ok(ExchangeStream::new(
            completion,
            prepared,
            self.sessions.clone(),
            character_id.to_string(),
        ))
    }

    /// Streams `input` to the current character.
    pub async fn send_streaming_to_current(
        &self,
        input: &str,
    ) -> std::result::Result<ExchangeStream, RejectReason> {
        let current = self.current_character.read().await.clone();
        match current {
            Some(character_id) => self.send_streaming(input, &character_id).await,
            None => Err(RejectReason::NoCharacter),
        }
    }

    /// Opens an empty session with an in-character greeting.
    ///
    /// Returns `Ok(None)` when the active session already has messages. A
    /// generated greeting is committed as an assistant message; when
    /// generation fails the persona's static greeting is returned and
    /// nothing is committed.
    pub async fn greet(
        &self,
        character_id: &str,
    ) -> std::result::Result<Option<Greeting>, RejectReason> {
        let persona = self.persona(character_id)?;
        let _guard = BusyGuard::acquire(&self.busy).ok_or(RejectReason::Busy)?;

        if !self.sessions.lock().await.active_messages(character_id).is_empty() {
            return Ok(None);
        }

        let greeting = match self.client.complete(&greeting_request(&persona)).await {
            CompletionReply::Generated(text) if !text.trim().is_empty() => {
                Greeting::generated(text.trim())
            }
            _ => {
                tracing::warn!(character_id, "Greeting generation failed, using static greeting");
                return Ok(Some(Greeting::fallback(&persona)));
            }
        };

        self.sessions
            .lock()
            .await
            .append_message(character_id, Message::assistant(greeting.text.clone()));
        Ok(Some(greeting))
    }
}

impl std::fmt::Debug for ConversationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOrchestrator")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// A streamed reply tied to an exchange.
///
/// Yields the same events as the underlying [`CompletionStream`]. When the
/// model produced nothing, a single fallback fragment is yielded before the
/// stream ends.
pub struct ExchangeStream {
    inner: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
    cancel: CancellationToken,
}

impl ExchangeStream {
    fn new(
        completion: CompletionStream,
        prepared: PreparedExchange,
        sessions: Arc<Mutex<SessionStore>>,
        character_id: String,
    ) -> Self {
        let cancel = completion.cancellation_token();
        let token = cancel.clone();
        let PreparedExchange { persona, guard, .. } = prepared;

        let inner = async_stream::stream! {
            let _guard = guard;
            let mut completion = completion;
            let mut total = String::new();
            let mut failed = false;

            while let Some(event) = completion.next().await {
                match &event {
                    StreamEvent::Fragment { total: so_far, .. } => total.clone_from(so_far),
                    StreamEvent::Failed { failure, .. } => {
                        tracing::warn!(character_id = %character_id, kind = failure.kind(), "Streamed exchange failed");
                        failed = true;
                    }
                }
                yield event;
            }

            if token.is_cancelled() {
                tracing::debug!(character_id = %character_id, "Streamed exchange cancelled");
            } else if !failed {
                if total.trim().is_empty() {
                    total = reply_or_fallback(&persona, total);
                    yield StreamEvent::Fragment { fragment: total.clone(), total: total.clone() };
                }
                sessions
                    .lock()
                    .await
                    .append_message(&character_id, Message::assistant(total));
            }
        };

        Self {
            inner: Box::pin(inner),
            cancel,
        }
    }

    /// Token that cancels this exchange.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drives the stream to the end and returns the outcome.
    pub async fn finish(mut self) -> ExchangeOutcome {
        let mut text = String::new();
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Fragment { total, .. } => text = total,
                StreamEvent::Failed { failure, text } => {
                    return ExchangeOutcome::Failed {
                        failure,
                        apology: text,
                    };
                }
            }
        }
        if self.cancel.is_cancelled() {
            ExchangeOutcome::Cancelled
        } else {
            ExchangeOutcome::Replied(text)
        }
    }
}

impl Stream for ExchangeStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for ExchangeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

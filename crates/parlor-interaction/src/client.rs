//! Completion client.
//!
//! [`CompletionBackend`] is the transport seam: the HTTP implementation talks
//! to an OpenAI-compatible endpoint, tests substitute scripted backends.
//! [`CompletionClient`] wraps a backend and never fails: every failure is
//! turned into display-ready text.

use crate::failure::CompletionFailure;
use crate::request::ChatRequest;
use crate::streaming::{CompletionStream, FragmentStream, sse_fragments};
use async_trait::async_trait;
use futures::StreamExt;
use parlor_core::config::{ApiConfig, SecretConfig, is_key_configured};
use reqwest::{Client, Response, header};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Transport for chat completions.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Sends a one-shot request and returns the generated text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, CompletionFailure>;

    /// Sends a streaming request and returns its text fragments.
    async fn stream(&self, request: &ChatRequest) -> Result<FragmentStream, CompletionFailure>;

    /// Returns whether a usable credential exists for `credential`.
    fn is_configured(&self, _credential: &str) -> bool {
        true
    }
}

/// Backend talking to an OpenAI-compatible HTTP endpoint.
#[derive(Clone)]
pub struct HttpCompletionBackend {
    client: Client,
    endpoint: String,
    secrets: SecretConfig,
}

impl HttpCompletionBackend {
    pub fn new(api: &ApiConfig, secrets: SecretConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: api.endpoint.clone(),
            secrets,
        })
    }

    fn api_key(&self, credential: &str) -> Result<String, CompletionFailure> {
        self.secrets.resolve(credential).ok_or_else(|| {
            CompletionFailure::Unauthorized(format!(
                "No API key configured for credential '{}'",
                credential
            ))
        })
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<Response, CompletionFailure> {
        let api_key = self.api_key(&request.credential)?;
        tracing::info!(model = %request.model, stream, "Sending chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request.to_wire(stream))
            .send()
            .await
            .map_err(|err| CompletionFailure::from_reqwest(&err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CompletionFailure> {
        let response = self.send(request, false).await?;
        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            CompletionFailure::Other(format!("Failed to parse completion response: {err}"))
        })?;
        Ok(extract_text_response(parsed))
    }

    async fn stream(&self, request: &ChatRequest) -> Result<FragmentStream, CompletionFailure> {
        let response = self.send(request, true).await?;
        Ok(Box::pin(sse_fragments(response.bytes_stream())))
    }

    fn is_configured(&self, credential: &str) -> bool {
        self.secrets
            .resolve(credential)
            .is_some_and(|key| is_key_configured(&key))
    }
}

impl std::fmt::Debug for HttpCompletionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCompletionBackend")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default()
}

fn map_http_error(status: reqwest::StatusCode, body: String) -> CompletionFailure {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    CompletionFailure::from_status(status, message)
}

/// Outcome of a one-shot completion.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionReply {
    /// Text produced by the model. May be empty.
    Generated(String),
    /// The request failed; `text` is ready to show in place of a reply.
    Fallback {
        failure: CompletionFailure,
        text: String,
    },
}

impl CompletionReply {
    pub fn from_failure(failure: CompletionFailure) -> Self {
        let text = failure.apology();
        Self::Fallback { failure, text }
    }

    /// The text to display, generated or not.
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::Fallback { text, .. } => text,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Never-failing completion client over a backend.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Sends `request` and waits for the whole reply.
    pub async fn complete(&self, request: &ChatRequest) -> CompletionReply {
        match self.backend.complete(request).await {
            Ok(text) => CompletionReply::Generated(text),
            Err(failure) => {
                tracing::error!(
                    model = %request.model,
                    kind = failure.kind(),
                    error = %failure,
                    "Chat completion failed"
                );
                CompletionReply::from_failure(failure)
            }
        }
    }

    /// Returns a lazy stream of the reply.
    ///
    /// The request is only sent once the stream is first polled.
    pub fn stream(&self, request: &ChatRequest) -> CompletionStream {
        let backend = self.backend.clone();
        let request = request.clone();

        let fragments = async_stream::stream! {
            match backend.stream(&request).await {
                Ok(mut fragments) => {
                    while let Some(item) = fragments.next().await {
                        if let Err(failure) = &item {
                            tracing::error!(
                                model = %request.model,
                                kind = failure.kind(),
                                error = %failure,
                                "Chat completion stream failed"
                            );
                        }
                        yield item;
                    }
                }
                Err(failure) => {
                    tracing::error!(
                        model = %request.model,
                        kind = failure.kind(),
                        error = %failure,
                        "Chat completion stream failed to start"
                    );
                    yield Err(failure);
                }
            }
        };

        CompletionStream::new(fragments)
    }

    /// Returns whether a usable API key exists for `credential`.
    pub fn is_configured(&self, credential: &str) -> bool {
        self.backend.is_configured(credential)
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::StreamEvent;
    use futures::stream;
    use parlor_core::persona::SamplingParams;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: Result<String, CompletionFailure>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn new(reply: Result<String, CompletionFailure>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, request: &ChatRequest) -> Result<String, CompletionFailure> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }

        async fn stream(&self, request: &ChatRequest) -> Result<FragmentStream, CompletionFailure> {
            self.seen.lock().unwrap().push(request.clone());
            let text = self.reply.clone()?;
            let words: Vec<Result<String, CompletionFailure>> = text
                .split_inclusive(' ')
                .map(|w| Ok(w.to_string()))
                .collect();
            Ok(Box::pin(stream::iter(words)))
        }
    }

    async fn drain(mut stream: CompletionStream) -> CompletionReply {
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Fragment { total, .. } => text = total,
                StreamEvent::Failed { failure, text } => {
                    return CompletionReply::Fallback { failure, text };
                }
            }
        }
        CompletionReply::Generated(text)
    }

    fn request() -> ChatRequest {
        ChatRequest {
            system_prompt: "sys".to_string(),
            history: Vec::new(),
            user_message: "hi".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            params: SamplingParams::default(),
            credential: "groq".to_string(),
        }
    }

    #[tokio::test]
    async fn test_complete_success() {
        let client = CompletionClient::new(ScriptedBackend::new(Ok("Well well!".to_string())));
        let reply = client.complete(&request()).await;
        assert_eq!(reply, CompletionReply::Generated("Well well!".to_string()));
    }

    #[tokio::test]
    async fn test_complete_failure_becomes_apology() {
        let backend = ScriptedBackend::new(Err(CompletionFailure::RateLimited("429".to_string())));
        let client = CompletionClient::new(backend);

        let reply = client.complete(&request()).await;

        assert!(!reply.is_generated());
        assert!(reply.text().starts_with("Slow down"));
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let backend = ScriptedBackend::new(Ok("a b".to_string()));
        let client = CompletionClient::new(backend.clone());

        let stream = client.stream(&request());
        assert!(backend.seen.lock().unwrap().is_empty());

        let reply = drain(stream).await;
        assert_eq!(reply, CompletionReply::Generated("a b".to_string()));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_start_failure() {
        let backend = ScriptedBackend::new(Err(CompletionFailure::Unauthorized("no key".to_string())));
        let client = CompletionClient::new(backend);

        let reply = drain(client.stream(&request())).await;

        assert!(reply.text().contains("lost my key"));
    }

    #[test]
    fn test_map_http_error_reads_error_body() {
        let failure = map_http_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":{"message":"The model `foo` does not exist","type":"invalid_request_error"}}"#
                .to_string(),
        );
        assert_eq!(
            failure,
            CompletionFailure::ModelUnavailable("The model `foo` does not exist".to_string())
        );

        let raw = map_http_error(reqwest::StatusCode::UNAUTHORIZED, "plain".to_string());
        assert_eq!(raw, CompletionFailure::Unauthorized("plain".to_string()));
    }

    #[test]
    fn test_extract_text_response_empty() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_text_response(parsed), "");

        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hey"}}]}"#).unwrap();
        assert_eq!(extract_text_response(parsed), "hey");
    }

    #[test]
    fn test_http_backend_is_configured() {
        let secrets = SecretConfig {
            default_api_key: None,
            credentials: BTreeMap::from([
                ("real".to_string(), "gsk_abcdefghijklmnopqrstuvwxyz".to_string()),
                ("placeholder".to_string(), "gsk_REPLACE_THIS_WITH_KEY".to_string()),
            ]),
        };
        let backend = HttpCompletionBackend::new(&ApiConfig::default(), secrets).unwrap();

        assert!(backend.is_configured("real"));
        assert!(!backend.is_configured("placeholder"));
        // The shared environment key covers selectors without a file entry.
        if std::env::var("GROQ_API_KEY").is_err() {
            assert!(!backend.is_configured("missing"));
        }
    }
}

//! Server-sent event decoding and the cancellable reply stream.

use crate::failure::CompletionFailure;
use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// Stream of raw text fragments from a backend.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, CompletionFailure>> + Send>>;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// What one SSE line contributed.
#[derive(Debug, PartialEq)]
enum LineOutcome {
    Fragment(String),
    Failure(CompletionFailure),
    Done,
    Skip,
}

fn decode_line(line: &str) -> LineOutcome {
    let Some(data) = line.trim().strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skip;
    };
    let data = data.trim();

    if data == DONE_MARKER {
        return LineOutcome::Done;
    }

    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(data) {
        return LineOutcome::Failure(CompletionFailure::classify_text(payload.error.message));
    }

    if let Ok(payload) = serde_json::from_str::<ChunkPayload>(data) {
        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .unwrap_or_default();
        return if content.is_empty() {
            LineOutcome::Skip
        } else {
            LineOutcome::Fragment(content)
        };
    }

    tracing::debug!("Skipping malformed stream payload");
    LineOutcome::Skip
}

fn utf8_line(raw: Vec<u8>) -> Option<String> {
    match String::from_utf8(raw) {
        Ok(line) => Some(line),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping stream line with invalid UTF-8");
            None
        }
    }
}

/// Decodes an SSE byte stream into content fragments.
///
/// Raw bytes are buffered across chunk boundaries and only complete lines
/// are decoded, so a multi-byte character split between chunks survives.
/// Lines that are not valid UTF-8 and malformed payloads are skipped. An
/// error payload ends the stream with a failure; `[DONE]` ends it normally.
pub fn sse_fragments<S, E>(bytes_stream: S) -> impl Stream<Item = Result<String, CompletionFailure>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<CompletionFailure> + Send + 'static,
{
    stream! {
        let mut bytes_stream = Box::pin(bytes_stream);
        let mut buffer: Vec<u8> = Vec::new();

        'read: loop {
            match bytes_stream.next().await {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(&bytes);
                    while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                        let raw: Vec<u8> = buffer.drain(..=newline).collect();
                        let Some(line) = utf8_line(raw) else {
                            continue;
                        };
                        match decode_line(&line) {
                            LineOutcome::Fragment(text) => yield Ok(text),
                            LineOutcome::Failure(failure) => {
                                yield Err(failure);
                                break 'read;
                            }
                            LineOutcome::Done => break 'read,
                            LineOutcome::Skip => {}
                        }
                    }
                }
                Some(Err(e)) => {
                    yield Err(e.into());
                    break 'read;
                }
                None => {
                    let line = utf8_line(std::mem::take(&mut buffer)).unwrap_or_default();
                    match decode_line(&line) {
                        LineOutcome::Fragment(text) => yield Ok(text),
                        LineOutcome::Failure(failure) => yield Err(failure),
                        LineOutcome::Done | LineOutcome::Skip => {}
                    }
                    break 'read;
                }
            }
        }
    }
}

/// One item of a reply stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A new piece of text and everything received so far.
    Fragment { fragment: String, total: String },
    /// The stream failed; `text` is ready to show in place of a reply.
    Failed {
        failure: CompletionFailure,
        text: String,
    },
}

/// A lazy, finite, non-restartable stream of reply fragments.
///
/// Nothing is sent until the stream is first polled. Cancelling through
/// [`CompletionStream::cancel`] or a cloned token ends the stream at the next
/// suspension point; dropping it abandons the request.
pub struct CompletionStream {
    inner: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
    cancel: CancellationToken,
}

impl CompletionStream {
    /// Wraps a fragment stream, accumulating the running total.
    pub fn new<S>(fragments: S) -> Self
    where
        S: Stream<Item = Result<String, CompletionFailure>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let inner = stream! {
            let mut fragments = Box::pin(fragments);
            let mut total = String::new();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    next = fragments.next() => next,
                };
                match next {
                    Some(Ok(fragment)) => {
                        total.push_str(&fragment);
                        yield StreamEvent::Fragment { fragment, total: total.clone() };
                    }
                    Some(Err(failure)) => {
                        let text = failure.apology();
                        yield StreamEvent::Failed { failure, text };
                        break;
                    }
                    None => break,
                }
            }
        };

        Self {
            inner: Box::pin(inner),
            cancel,
        }
    }

    /// Token that cancels this stream.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

}

impl Stream for CompletionStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for CompletionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, CompletionFailure>> + Send + 'static {
        let owned: Vec<Result<Bytes, CompletionFailure>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        stream::iter(owned)
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    #[tokio::test]
    async fn test_fragments_until_done() {
        let body = format!("{}{}data: [DONE]\n\n{}", delta("Hel"), delta("lo"), delta("ignored"));
        let fragments: Vec<_> = sse_fragments(chunks(&[&body])).collect().await;

        assert_eq!(fragments, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let line = delta("split");
        let (a, b) = line.split_at(12);
        let fragments: Vec<_> = sse_fragments(chunks(&[a, b])).collect().await;

        assert_eq!(fragments, vec![Ok("split".to_string())]);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let line = delta("héllo 🔪");
        let knife = line.find('🔪').unwrap();
        let (a, b) = line.as_bytes().split_at(knife + 2);
        let parts: Vec<Result<Bytes, CompletionFailure>> =
            vec![Ok(Bytes::copy_from_slice(a)), Ok(Bytes::copy_from_slice(b))];
        let fragments: Vec<_> = sse_fragments(stream::iter(parts)).collect().await;

        assert_eq!(fragments, vec![Ok("héllo 🔪".to_string())]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_skipped() {
        let mut body = b"data: \xff\xfe\n\n".to_vec();
        body.extend_from_slice(delta("fine").as_bytes());
        let parts: Vec<Result<Bytes, CompletionFailure>> = vec![Ok(Bytes::from(body))];
        let fragments: Vec<_> = sse_fragments(stream::iter(parts)).collect().await;

        assert_eq!(fragments, vec![Ok("fine".to_string())]);
    }

    #[tokio::test]
    async fn test_malformed_payload_skipped() {
        let body = format!("data: {{not json\n\n: keep-alive\n\n{}data: [DONE]\n", delta("ok"));
        let fragments: Vec<_> = sse_fragments(chunks(&[&body])).collect().await;

        assert_eq!(fragments, vec![Ok("ok".to_string())]);
    }

    #[tokio::test]
    async fn test_error_payload_ends_stream() {
        let body = format!(
            "{}data: {{\"error\": {{\"message\": \"Rate limit reached\"}}}}\n\n{}",
            delta("a"),
            delta("b")
        );
        let fragments: Vec<_> = sse_fragments(chunks(&[&body])).collect().await;

        assert_eq!(fragments.len(), 2);
        assert!(matches!(fragments[1], Err(CompletionFailure::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_completion_stream_running_total() {
        let fragments = stream::iter(vec![Ok("a".to_string()), Ok("b".to_string())]);
        let events: Vec<_> = CompletionStream::new(fragments).collect().await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment { fragment: "a".to_string(), total: "a".to_string() },
                StreamEvent::Fragment { fragment: "b".to_string(), total: "ab".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_completion_stream_failure_carries_apology() {
        let fragments = stream::once(async { Err(CompletionFailure::Network("down".to_string())) });
        let events: Vec<_> = CompletionStream::new(fragments).collect().await;

        match &events[..] {
            [StreamEvent::Failed { failure, text }] => {
                assert_eq!(failure.kind(), "network");
                assert!(text.starts_with("You're offline"));
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_ends_stream() {
        let fragments = stream::iter(vec![Ok("a".to_string())]).chain(stream::pending());
        let mut stream = CompletionStream::new(fragments);

        assert!(matches!(stream.next().await, Some(StreamEvent::Fragment { .. })));
        stream.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.cancellation_token().is_cancelled());
    }
}

//! Completion client for the OpenAI-compatible chat endpoint.
//!
//! One-shot and streaming requests, with every transport failure classified
//! into a [`CompletionFailure`] that carries display-ready text.

pub mod client;
pub mod failure;
pub mod request;
pub mod streaming;

pub use client::{CompletionBackend, CompletionClient, CompletionReply, HttpCompletionBackend};
pub use failure::CompletionFailure;
pub use request::ChatRequest;
pub use streaming::{CompletionStream, FragmentStream, StreamEvent, sse_fragments};

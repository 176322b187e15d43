//! Persona domain model.
//!
//! A persona is a chat character: display metadata, the remote model it runs
//! on, sampling parameters and the system prompt that gives it a voice.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Default sampling temperature sent to the completion endpoint.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default token ceiling for one reply.
pub const DEFAULT_MAX_TOKENS: u32 = 600;
/// Default nucleus sampling value.
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Per-field sampling overrides.
///
/// Unset fields fall back to the defaults above when the request is resolved.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SamplingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl SamplingParams {
    /// Returns a copy with `max_tokens` replaced for a single request.
    pub fn with_max_tokens(&self, max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..self.clone()
        }
    }

    pub fn temperature_or_default(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn top_p_or_default(&self) -> f32 {
        self.top_p.unwrap_or(DEFAULT_TOP_P)
    }
}

/// A chat persona. Read-only at runtime.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Persona {
    /// Unique identifier (e.g. `character-a`)
    pub id: String,
    /// Full display name
    pub name: String,
    /// Short label for pickers
    pub display_name: String,
    pub emoji: String,
    /// Avatar asset path
    pub avatar: String,
    /// Accent color (CSS hex)
    pub color: String,
    /// Remote model identifier
    pub model: String,
    #[serde(default)]
    pub params: SamplingParams,
    /// Base system prompt; never replaced, only extended
    pub system_prompt: String,
    /// Greeting shown when an AI-generated one cannot be produced
    pub fallback_greeting: String,
    /// In-character lines used when the model returns nothing
    #[serde(default)]
    pub fallback_responses: Vec<String>,
    /// Selector for the API credential this persona sends requests with
    pub credential: String,
}

impl Persona {
    /// The persona's own reply ceiling.
    pub fn max_tokens_ceiling(&self) -> u32 {
        self.params.max_tokens_or_default()
    }

    /// Picks one fallback response at random.
    pub fn random_fallback_response(&self) -> Option<&str> {
        self.fallback_responses
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}

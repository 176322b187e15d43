//! Chat request shaping.
//!
//! A [`ChatRequest`] is what the orchestrator hands to the completion client:
//! the persona's (annotated) system prompt, the prior history, the new user
//! message, the model and the per-request sampling parameters. It is turned
//! into the OpenAI-compatible wire body by [`ChatRequest::to_wire`].

use parlor_core::persona::SamplingParams;
use parlor_core::session::Message;
use serde::Serialize;

/// A structured chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_prompt: String,
    /// Prior messages, oldest first
    pub history: Vec<Message>,
    /// The message being answered
    pub user_message: String,
    pub model: String,
    pub params: SamplingParams,
    /// Selector for the API credential
    pub credential: String,
}

impl ChatRequest {
    /// Builds the wire body.
    ///
    /// Messages are `[system, ...history, user]`. Unset sampling fields take
    /// the defaults; penalties are only sent when set.
    pub fn to_wire(&self, stream: bool) -> WireRequest<'_> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(WireMessage {
            role: "system",
            content: &self.system_prompt,
        });
        messages.extend(self.history.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));
        messages.push(WireMessage {
            role: "user",
            content: &self.user_message,
        });

        WireRequest {
            model: &self.model,
            messages,
            temperature: self.params.temperature_or_default(),
            max_tokens: self.params.max_tokens_or_default(),
            top_p: self.params.top_p_or_default(),
            frequency_penalty: self.params.frequency_penalty,
            presence_penalty: self.params.presence_penalty,
            stream,
        }
    }
}

/// OpenAI-compatible chat completion body.
#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(params: SamplingParams) -> ChatRequest {
        ChatRequest {
            system_prompt: "You are Lawrence.".to_string(),
            history: vec![Message::user("hey"), Message::assistant("...hi")],
            user_message: "how are you".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            params,
            credential: "groq".to_string(),
        }
    }

    #[test]
    fn test_wire_messages_order() {
        let body = serde_json::to_value(request(SamplingParams::default()).to_wire(false)).unwrap();

        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "You are Lawrence."},
                {"role": "user", "content": "hey"},
                {"role": "assistant", "content": "...hi"},
                {"role": "user", "content": "how are you"},
            ])
        );
        assert_eq!(body["stream"], json!(false));
    }

    #[test]
    fn test_defaults_and_omitted_penalties() {
        let body = serde_json::to_value(request(SamplingParams::default()).to_wire(true)).unwrap();

        assert_eq!(body["max_tokens"], json!(600));
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!(body.get("frequency_penalty").is_none());
        assert!(body.get("presence_penalty").is_none());
        assert_eq!(body["stream"], json!(true));
    }

    #[test]
    fn test_overrides_sent() {
        let params = SamplingParams {
            temperature: Some(0.85),
            max_tokens: Some(80),
            top_p: Some(0.92),
            frequency_penalty: Some(0.6),
            presence_penalty: Some(0.5),
        };
        let body = serde_json::to_value(request(params).to_wire(false)).unwrap();

        assert_eq!(body["max_tokens"], json!(80));
        assert!((body["frequency_penalty"].as_f64().unwrap() - 0.6).abs() < 1e-6);
        assert!((body["presence_penalty"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(body["model"], json!("llama-3.3-70b-versatile"));
    }
}

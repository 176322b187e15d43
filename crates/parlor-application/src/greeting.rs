//! In-character opening lines.

use parlor_core::persona::Persona;
use parlor_interaction::ChatRequest;

/// Instruction sent as the user turn when asking a persona to say hello.
pub fn greeting_prompt(persona: &Persona) -> String {
    format!(
        "You are {}. Generate a brief, in-character first greeting (2-3 sentences max) for when someone opens a chat with you. Make it welcoming but true to your personality. Do not use asterisks or roleplay actions, just speak naturally.",
        persona.name
    )
}

/// Request for a greeting: the plain persona prompt, no history.
pub fn greeting_request(persona: &Persona) -> ChatRequest {
    ChatRequest {
        system_prompt: persona.system_prompt.clone(),
        history: Vec::new(),
        user_message: greeting_prompt(persona),
        model: persona.model.clone(),
        params: persona.params.clone(),
        credential: persona.credential.clone(),
    }
}

/// An opening line and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub text: String,
    /// `false` when the static fallback greeting was used
    pub generated: bool,
}

impl Greeting {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            generated: true,
        }
    }

    pub fn fallback(persona: &Persona) -> Self {
        Self {
            text: persona.fallback_greeting.clone(),
            generated: false,
        }
    }
}

//! Continuity annotation appended to the persona's system prompt.

use crate::budget::ReplyLength;

/// Whether `message` pivots the conversation: a question, or a
/// "but" / "what about" turn.
pub fn explores_new_angle(message: &str) -> bool {
    let lower = message.to_lowercase();
    message.contains('?')
        || lower.contains("what about")
        || lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == "but")
}

/// Brevity hint for an ongoing conversation.
///
/// Follows the word-count tiers, except that a short pivot (4 to 8 words)
/// is hinted moderate. Other tiers are never moved.
fn ongoing_hint(message: &str) -> &'static str {
    match ReplyLength::for_input(message) {
        ReplyLength::VeryBrief => "VERY brief reply (1 sentence max)",
        ReplyLength::Short if explores_new_angle(message) => "moderate reply (2-3 sentences)",
        ReplyLength::Short => "short response (1-2 sentences)",
        ReplyLength::Moderate => "moderate reply (2-3 sentences)",
        ReplyLength::Medium | ReplyLength::Long => "you can elaborate more",
    }
}

/// Builds the context block for `message` following `prior_messages`
/// earlier messages.
///
/// The returned text starts with a blank line so it can be appended
/// directly to the base prompt.
pub fn continuity_annotation(prior_messages: usize, message: &str) -> String {
    if prior_messages == 0 {
        let reply = if ReplyLength::for_input(message) == ReplyLength::VeryBrief {
            "very brief (1 sentence)"
        } else {
            "concise (2-3 sentences)"
        };
        return format!(
            "\n\n[CONVERSATION CONTEXT: This is the start of a new conversation. Be welcoming and {}.]",
            reply
        );
    }

    format!(
        "\n\n[CONVERSATION CONTEXT:\n\
         - This is an ongoing chat with {} previous messages\n\
         - The conversation is flowing naturally - they're building on topics, not repeating themselves\n\
         - If they mention something similar to before, they're likely exploring it from a new angle or continuing the thread\n\
         - DO NOT ask if they're repeating themselves or say things like \"didn't you just say that?\" - assume good faith\n\
         - Reference earlier points only when directly relevant, don't call out similarities\n\
         - Match their energy: {}]",
        prior_messages,
        ongoing_hint(message)
    )
}

/// The persona prompt with the annotation appended.
pub fn annotate_prompt(base_prompt: &str, prior_messages: usize, message: &str) -> String {
    let mut prompt = String::with_capacity(base_prompt.len() + 512);
    prompt.push_str(base_prompt);
    prompt.push_str(&continuity_annotation(prior_messages, message));
    prompt
}

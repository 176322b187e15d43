//! Application layer for Parlor.
//!
//! Turns user input into exchanges with a persona: reply budgeting, the
//! continuity annotation, the one-at-a-time conversation orchestrator and
//! the application state lifecycle.

pub mod budget;
pub mod continuity;
pub mod conversation;
pub mod greeting;
pub mod state;


pub use budget::{ReplyLength, token_budget, word_count};
pub use continuity::{annotate_prompt, continuity_annotation};
pub use conversation::{
    CONNECTION_TROUBLE, ConversationOrchestrator, ExchangeOutcome, ExchangeStream, RejectReason,
    build_request,
};
pub use greeting::Greeting;
pub use state::AppState;

//! REPL command parsing.

use parlor_core::session::SessionSummary;

/// Slash commands with their one-line help.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/characters", "list the available characters"),
    ("/character", "<id> chat with a character"),
    ("/sessions", "list the current character's sessions"),
    ("/new", "[name] start a new session and switch to it"),
    ("/switch", "<n|id> switch to another session"),
    ("/rename", "<n|id> <name> rename a session"),
    ("/delete", "<n|id> delete a session"),
    ("/clear", "delete every session of the current character"),
    ("/history", "show the active session"),
    ("/stream", "toggle streamed replies"),
    ("/help", "show this help"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Characters,
    Character(String),
    Sessions,
    New(Option<String>),
    Switch(String),
    Rename { target: String, name: String },
    Delete(String),
    Clear,
    History,
    Stream,
    Help,
    Quit,
    /// Plain text for the current character
    Message(String),
    /// A known command used without its required arguments
    Usage(&'static str),
    Unknown(String),
}

/// Parses one input line.
pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Command::Quit;
    }
    if !line.starts_with('/') {
        return Command::Message(line.to_string());
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "/characters" => Command::Characters,
        "/character" => arg.map_or(Command::Usage("/character <id>"), Command::Character),
        "/sessions" => Command::Sessions,
        "/new" => Command::New(arg),
        "/switch" => arg.map_or(Command::Usage("/switch <n|id>"), Command::Switch),
        "/delete" => arg.map_or(Command::Usage("/delete <n|id>"), Command::Delete),
        "/rename" => match rest.split_once(char::is_whitespace) {
            Some((target, name)) if !name.trim().is_empty() => Command::Rename {
                target: target.to_string(),
                name: name.trim().to_string(),
            },
            _ => Command::Usage("/rename <n|id> <name>"),
        },
        "/clear" => Command::Clear,
        "/history" => Command::History,
        "/stream" => Command::Stream,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

/// Commands whose first argument names a session.
const SESSION_COMMANDS: &[&str] = &["/switch", "/rename", "/delete"];

/// What the line editor can offer beyond command names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSources {
    pub character_ids: Vec<String>,
    /// Number of sessions of the current character
    pub session_count: usize,
}

/// Completion candidates for the text before the cursor.
///
/// Returns the byte offset where the replaced word starts. Command names are
/// offered for the first word, character ids after `/character`, and session
/// numbers after the session commands.
pub fn complete(line: &str, sources: &CompletionSources) -> (usize, Vec<String>) {
    if !line.starts_with('/') {
        return (0, Vec::new());
    }

    let Some((name, arg)) = line.split_once(' ') else {
        let names = COMMANDS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| name.starts_with(line))
            .map(str::to_string)
            .collect();
        return (0, names);
    };

    let start = name.len() + 1 + (arg.len() - arg.trim_start().len());
    let word = arg.trim_start();
    if word.contains(char::is_whitespace) {
        return (start, Vec::new());
    }

    let candidates: Vec<String> = if name == "/character" {
        sources.character_ids.clone()
    } else if SESSION_COMMANDS.contains(&name) {
        (1..=sources.session_count).map(|n| n.to_string()).collect()
    } else {
        Vec::new()
    };

    let matching = candidates.into_iter().filter(|c| c.starts_with(word)).collect();
    (start, matching)
}

/// Resolves a session reference typed by the user.
///
/// A 1-based position in `sessions` picks that session; anything else is
/// taken as a session id.
pub fn resolve_session(target: &str, sessions: &[SessionSummary]) -> String {
    target
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| sessions.get(index))
        .map(|summary| summary.id.clone())
        .unwrap_or_else(|| target.to_string())
}

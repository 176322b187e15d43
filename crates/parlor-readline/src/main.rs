use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use parlor_application::AppState;
use parlor_core::config::SecretConfig;
use parlor_infrastructure::{ConfigService, SecretStorage};

mod commands;
mod logging;
mod repl;

use commands::CompletionSources;
use repl::{Flow, Repl};

/// Line editor helper.
///
/// Completes command names, character ids after `/character` and session
/// numbers after the session commands. An unambiguous completion is shown
/// as a dimmed hint.
struct ChatHelper {
    sources: CompletionSources,
}

impl ChatHelper {
    fn new() -> Self {
        Self {
            sources: CompletionSources::default(),
        }
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(commands::complete(&line[..pos], &self.sources))
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }

        let (start, candidates) = commands::complete(line, &self.sources);
        let typed = &line[start..];
        match candidates.as_slice() {
            [only] if only.len() > typed.len() => Some(only[typed.len()..].to_string()),
            _ => None,
        }
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Borrowed(line);
        }
        match line.split_once(' ') {
            Some((name, rest)) => Owned(format!("{} {}", name.bright_cyan(), rest)),
            None => Owned(line.bright_cyan().to_string()),
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, line: &str, _pos: usize, _forced: bool) -> bool {
        line.starts_with('/')
    }
}

impl Validator for ChatHelper {}

/// Terminal chat with the Parlor characters.
///
/// 1. Loads config and secrets, installs file logging
/// 2. Builds the application state (sessions, legacy migration, preferred character)
/// 3. Runs the REPL until `quit` or Ctrl-D
/// 4. Flushes the session document
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Configuration & logging =====
    let config_service = ConfigService::new();
    let config_result = config_service.load();
    let config = config_result.clone().unwrap_or_default();
    let _log_guard = logging::init(&config.logging);
    if let Err(e) = config_result {
        tracing::warn!(error = %e, "Failed to load config; using defaults");
        eprintln!("{}", format!("Config ignored: {}", e).yellow());
    }

    let secrets = match SecretStorage::new() {
        Ok(storage) => storage.load_or_init(),
        Err(e) => {
            tracing::warn!(error = %e, "No secret storage; relying on environment");
            SecretConfig::default()
        }
    };

    // ===== Application state =====
    let streaming = config.api.stream;
    let state = AppState::initialize(config, secrets).await?;
    let mut repl = Repl::new(state.orchestrator().clone(), streaming);

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(ChatHelper::new()));

    println!("{}", "=== Parlor ===".bright_magenta().bold());
    println!("{}", "Type a message to chat, '/help' for commands, or 'quit' to exit.".bright_black());
    if !state.store().is_available() {
        println!("{}", "Storage unavailable: chats will not be saved.".yellow());
    }
    println!();

    match state.orchestrator().current_character().await {
        Some(persona) => {
            println!("{}", format!("{} {}", persona.emoji, persona.name).bright_magenta().bold());
            repl.greet(&persona).await;
        }
        None => {
            repl.list_characters().await;
            println!("{}", "Choose someone with /character <id>".bright_black());
        }
    }

    // ===== Main REPL Loop =====
    loop {
        let sources = repl.completion_sources().await;
        if let Some(helper) = rl.helper_mut() {
            helper.sources = sources;
        }

        match rl.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if repl.handle(commands::parse(&line)).await == Flow::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    state.shutdown().await;
    Ok(())
}

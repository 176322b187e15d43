//! Command handling for the terminal chat.

use crate::commands::{COMMANDS, Command, CompletionSources, resolve_session};
use chrono::{DateTime, Local};
use colored::Colorize;
use futures::StreamExt;
use parlor_application::{ConversationOrchestrator, ExchangeOutcome, RejectReason};
use parlor_core::config::selector_env_var;
use parlor_core::persona::Persona;
use parlor_core::session::{DEFAULT_SESSION_NAME, MessageRole};
use parlor_interaction::StreamEvent;
use std::io::Write;
use std::sync::Arc;

/// Whether the REPL should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Repl {
    orchestrator: Arc<ConversationOrchestrator>,
    streaming: bool,
}

impl Repl {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>, streaming: bool) -> Self {
        Self {
            orchestrator,
            streaming,
        }
    }

    pub async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => return Flow::Quit,
            Command::Message(text) => self.send(&text).await,
            Command::Characters => self.list_characters().await,
            Command::Character(id) => self.select_character(&id).await,
            Command::Sessions => self.list_sessions().await,
            Command::New(name) => self.new_session(name).await,
            Command::Switch(target) => self.switch_session(&target).await,
            Command::Rename { target, name } => self.rename_session(&target, &name).await,
            Command::Delete(target) => self.delete_session(&target).await,
            Command::Clear => self.clear_sessions().await,
            Command::History => self.show_history().await,
            Command::Stream => {
                self.streaming = !self.streaming;
                let state = if self.streaming { "on" } else { "off" };
                println!("{}", format!("Streamed replies {}", state).bright_black());
            }
            Command::Help => print_help(),
            Command::Usage(usage) => println!("{}", format!("Usage: {}", usage).yellow()),
            Command::Unknown(name) => {
                println!("{}", format!("Unknown command {}. Try /help", name).bright_black())
            }
        }
        Flow::Continue
    }

    /// Character ids and the current character's session count, for the
    /// line editor.
    pub async fn completion_sources(&self) -> CompletionSources {
        let character_ids = self
            .orchestrator
            .registry()
            .all()
            .iter()
            .map(|persona| persona.id.clone())
            .collect();
        let session_count = match self.orchestrator.current_character().await {
            Some(persona) => self.orchestrator.sessions().lock().await.list_sessions(&persona.id).len(),
            None => 0,
        };

        CompletionSources {
            character_ids,
            session_count,
        }
    }

    async fn current(&self) -> Option<Persona> {
        let current = self.orchestrator.current_character().await;
        if current.is_none() {
            println!("{}", "Pick a character first: /characters, then /character <id>".yellow());
        }
        current
    }

    // ============================================================================
    // Characters
    // ============================================================================

    pub async fn list_characters(&self) {
        let current = self.orchestrator.current_character().await.map(|p| p.id);
        for persona in self.orchestrator.registry().all() {
            let marker = if current.as_deref() == Some(persona.id.as_str()) { "*" } else { " " };
            println!(
                "{} {} {} {}",
                marker,
                persona.emoji,
                persona.display_name.bright_magenta().bold(),
                format!("({})", persona.id).bright_black()
            );
        }
    }

    async fn select_character(&self, id: &str) {
        let persona = match self.orchestrator.select_character(id).await {
            Ok(persona) => persona,
            Err(e) => {
                println!("{}", e.to_string().red());
                return;
            }
        };

        println!("{}", format!("{} {}", persona.emoji, persona.name).bright_magenta().bold());
        if !self.orchestrator.client().is_configured(&persona.credential) {
            println!(
                "{}",
                format!(
                    "No API key configured. Add it to secret.json or set {}.",
                    selector_env_var(&persona.credential)
                )
                .yellow()
            );
        }
        self.greet(&persona).await;
    }

    /// Greets in an empty session.
    pub async fn greet(&self, persona: &Persona) {
        match self.orchestrator.greet(&persona.id).await {
            Ok(Some(greeting)) => print_reply(persona, &greeting.text),
            Ok(None) => {}
            Err(reason) => println!("{}", reason.to_string().yellow()),
        }
    }

    // ============================================================================
    // Exchanges
    // ============================================================================

    async fn send(&self, text: &str) {
        let Some(persona) = self.current().await else {
            return;
        };

        if self.streaming {
            self.send_streaming(&persona, text).await;
            return;
        }

        match self.orchestrator.send(text, &persona.id).await {
            ExchangeOutcome::Replied(reply) => print_reply(&persona, &reply),
            ExchangeOutcome::Failed { apology, .. } => print_apology(&persona, &apology),
            ExchangeOutcome::Cancelled => {}
            ExchangeOutcome::Rejected(reason) => print_rejection(&reason),
        }
    }

    async fn send_streaming(&self, persona: &Persona, text: &str) {
        let mut stream = match self.orchestrator.send_streaming(text, &persona.id).await {
            Ok(stream) => stream,
            Err(reason) => {
                print_rejection(&reason);
                return;
            }
        };

        println!("{}", format!("[{}]", persona.display_name).bright_magenta());
        let mut stdout = std::io::stdout();
        loop {
            tokio::select! {
                event = stream.next() => match event {
                    Some(StreamEvent::Fragment { fragment, .. }) => {
                        print!("{}", fragment.bright_blue());
                        let _ = stdout.flush();
                    }
                    Some(StreamEvent::Failed { text, .. }) => {
                        println!("{}", text.red());
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    stream.cancel();
                    println!();
                    println!("{}", "Reply cancelled.".yellow());
                }
            }
        }
        println!();
    }

    // ============================================================================
    // Sessions
    // ============================================================================

    async fn list_sessions(&self) {
        let Some(persona) = self.current().await else {
            return;
        };
        let sessions = self.orchestrator.sessions().lock().await.list_sessions(&persona.id);

        for (index, summary) in sessions.iter().enumerate() {
            let marker = if summary.is_active { "*" } else { " " };
            let created = DateTime::from_timestamp_millis(summary.created)
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{} {} {} {} {}",
                marker,
                format!("{}.", index + 1).bright_black(),
                summary.name.bold(),
                format!("({} messages, {})", summary.message_count, created).bright_black(),
                summary.id.bright_black()
            );
            println!("     {}", summary.preview.bright_black());
        }
    }

    async fn new_session(&self, name: Option<String>) {
        let Some(persona) = self.current().await else {
            return;
        };
        let name = name.unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

        {
            let mut sessions = self.orchestrator.sessions().lock().await;
            let id = sessions.create_session(&persona.id, &name);
            if let Err(e) = sessions.switch_active_session(&persona.id, &id) {
                println!("{}", e.to_string().red());
                return;
            }
        }

        println!("{}", format!("Started \"{}\"", name).green());
        self.greet(&persona).await;
    }

    async fn switch_session(&self, target: &str) {
        let Some(persona) = self.current().await else {
            return;
        };

        let result = {
            let mut sessions = self.orchestrator.sessions().lock().await;
            let id = resolve_session(target, &sessions.list_sessions(&persona.id));
            sessions
                .switch_active_session(&persona.id, &id)
                .map(|_| sessions.active_session(&persona.id))
        };

        match result {
            Ok(active) => {
                println!("{}", format!("Switched to \"{}\"", active.name).green());
                self.show_history().await;
            }
            Err(e) => println!("{}", e.to_string().red()),
        }
    }

    async fn rename_session(&self, target: &str, name: &str) {
        let Some(persona) = self.current().await else {
            return;
        };

        let mut sessions = self.orchestrator.sessions().lock().await;
        let id = resolve_session(target, &sessions.list_sessions(&persona.id));
        match sessions.rename_session(&persona.id, &id, name) {
            Ok(()) => println!("{}", format!("Renamed to \"{}\"", name).green()),
            Err(e) => println!("{}", e.to_string().red()),
        }
    }

    async fn delete_session(&self, target: &str) {
        let Some(persona) = self.current().await else {
            return;
        };

        let mut sessions = self.orchestrator.sessions().lock().await;
        let id = resolve_session(target, &sessions.list_sessions(&persona.id));
        match sessions.delete_session(&persona.id, &id) {
            Ok(()) => {
                let active = sessions.active_session(&persona.id);
                println!(
                    "{}",
                    format!("Session deleted. Now in \"{}\"", active.name).green()
                );
            }
            Err(e) => println!("{}", e.to_string().red()),
        }
    }

    async fn clear_sessions(&self) {
        let Some(persona) = self.current().await else {
            return;
        };
        self.orchestrator.sessions().lock().await.reset_thread(&persona.id);
        println!("{}", "All sessions cleared.".green());
        self.greet(&persona).await;
    }

    async fn show_history(&self) {
        let Some(persona) = self.current().await else {
            return;
        };
        let messages = self
            .orchestrator
            .sessions()
            .lock()
            .await
            .active_messages(&persona.id)
            .to_vec();

        if messages.is_empty() {
            println!("{}", "No messages yet".bright_black());
        }
        for message in messages {
            match message.role {
                MessageRole::User => println!("{}", format!("> {}", message.content).green()),
                MessageRole::Assistant => print_reply(&persona, &message.content),
            }
        }
    }
}

fn print_reply(persona: &Persona, text: &str) {
    println!("{}", format!("[{}]", persona.display_name).bright_magenta());
    for line in text.lines() {
        println!("{}", line.bright_blue());
    }
}

fn print_apology(persona: &Persona, text: &str) {
    println!("{}", format!("[{}]", persona.display_name).bright_magenta());
    println!("{}", text.red());
}

fn print_rejection(reason: &RejectReason) {
    if *reason != RejectReason::EmptyInput {
        println!("{}", reason.to_string().yellow());
    }
}

pub fn print_help() {
    for (name, description) in COMMANDS {
        println!("  {} {}", name.bright_cyan(), description.bright_black());
    }
    println!("  {} {}", "quit".bright_cyan(), "leave the chat".bright_black());
}

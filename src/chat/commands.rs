// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! REPL slash command parsing
//!
//! Parsing is kept free of I/O so it can be tested directly.

/// Represents the different types of commands that can be issued in chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the REPL
    Exit,
    /// Show help information
    Help,
    /// Clear the conversation (and the active session's history)
    Clear,
    /// Show the active session
    Session,
    /// Persist the active session and switch to another
    SwitchSession(String),
    /// List stored sessions
    Sessions,
    /// List loaded tools
    Tools,
    /// Show the active model
    Model,
    /// Show the resolved configuration
    Config,
    /// Regular user message (not a command)
    Message(String),
    /// Empty input
    Empty,
    /// Unknown slash command
    Unknown(String),
}

/// Parse user input into a ChatCommand
pub fn parse_command(input: &str) -> ChatCommand {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return ChatCommand::Empty;
    }

    let lower = trimmed.to_lowercase();
    if lower == "exit" || lower == "quit" {
        return ChatCommand::Exit;
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return ChatCommand::Message(trimmed.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name.to_lowercase().as_str(), arg) {
        ("exit" | "quit", _) => ChatCommand::Exit,
        ("help" | "?", _) => ChatCommand::Help,
        ("clear", _) => ChatCommand::Clear,
        ("session", "") => ChatCommand::Session,
        ("session", id) => ChatCommand::SwitchSession(id.to_string()),
        ("sessions", _) => ChatCommand::Sessions,
        ("tools", _) => ChatCommand::Tools,
        ("model", _) => ChatCommand::Model,
        ("config", _) => ChatCommand::Config,
        _ => ChatCommand::Unknown(trimmed.to_string()),
    }
}

/// Format help text for display
pub fn format_help_text() -> String {
    r#"Commands:
  /help            - Show this help message
  /clear           - Clear the conversation
  /session         - Show the active session
  /session <id>    - Save the active session and switch to <id>
  /sessions        - List stored sessions
  /tools           - List loaded tools
  /model           - Show the active model
  /config          - Show the resolved configuration
  /exit, /quit     - Leave (also: exit, quit, Ctrl+D)

Ctrl+C cancels the running turn."#
        .to_string()
}

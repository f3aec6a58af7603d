// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Display formatting for the chat interface
//!
//! Functions return formatted strings rather than writing to stdout, so the
//! REPL decides where and in which colour they go.

use crate::error::{ErrorCategory, PalaverError};
use crate::llm::message::ContentBlock;
use crate::session::SessionInfo;
use crate::tools::ToolRegistry;

/// Format an error for the user.
///
/// Provider and user errors show only their message unless `debug` is set.
/// System errors always include the source chain.
pub fn format_error(error: &PalaverError, debug: bool) -> String {
    let mut msg = match error.category() {
        ErrorCategory::Provider => match error {
            PalaverError::Api(api) if error.is_context_overflow() => format!(
                "{}\nTry /clear to reset the conversation, or lower conversation.window_size.",
                api
            ),
            PalaverError::Api(api) => format!("Provider error: {}", api),
            other => format!("Provider error: {}", other),
        },
        ErrorCategory::User => format!("Error: {}", error),
        ErrorCategory::System => format!("Internal error (this is a bug): {}", error),
    };

    if debug || error.category() == ErrorCategory::System {
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            msg.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        if error.category() == ErrorCategory::System {
            msg.push_str(&format!("\n  debug: {:?}", error));
        }
    }

    msg
}

/// Truncate a string for display with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One-line summary of a tool call
pub fn format_tool_invocation(tool_name: &str, input: &serde_json::Value) -> String {
    let args = serde_json::to_string(input).unwrap_or_default();
    if args.is_empty() || args == "{}" || args == "null" {
        format!("-> {}", tool_name)
    } else {
        format!("-> {} {}", tool_name, truncate_string(&args, 60))
    }
}

/// One-line summary of a tool result
pub fn format_tool_result(tool_name: &str, result: &ContentBlock) -> String {
    let ContentBlock::ToolResult {
        content, is_error, ..
    } = result
    else {
        return format!("<- {}", tool_name);
    };

    let first_line = content.lines().next().unwrap_or("").trim();
    let line_count = content.lines().count();
    if *is_error {
        format!("<- {} failed: {}", tool_name, truncate_string(first_line, 80))
    } else if content.trim().is_empty() {
        format!("<- {} (no output)", tool_name)
    } else if line_count > 1 {
        format!(
            "<- {}: {} (+{} lines)",
            tool_name,
            truncate_string(first_line, 60),
            line_count - 1
        )
    } else {
        format!("<- {}: {}", tool_name, truncate_string(first_line, 80))
    }
}

/// Format welcome message
pub fn format_welcome(model: &str, session_id: Option<&str>, tool_count: usize) -> String {
    let mut output = String::new();
    output.push_str(&format!("palaver | model: {}\n", model));
    match session_id {
        Some(id) => output.push_str(&format!("Session: {}\n", id)),
        None => output.push_str("Session: (not saved; use /session <id> to keep it)\n"),
    }
    if tool_count > 0 {
        output.push_str(&format!("Tools: {}\n", tool_count));
    }
    output.push_str("Type /help for commands, or start chatting.");
    output
}

/// Format the session listing
pub fn format_session_list(sessions: &[SessionInfo], current: Option<&str>) -> String {
    if sessions.is_empty() {
        return "No saved sessions.".to_string();
    }

    sessions
        .iter()
        .map(|s| {
            let marker = if current == Some(s.id.as_str()) { "*" } else { " " };
            let summary = s.summary.as_deref().unwrap_or("(empty)");
            format!(
                "{} {:<20} {}  {:>4} msgs  {}",
                marker,
                s.id,
                s.updated_at.format("%Y-%m-%d %H:%M"),
                s.message_count,
                truncate_string(summary, 40)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the loaded tools
pub fn format_tool_list(registry: &ToolRegistry) -> String {
    if registry.is_empty() {
        return "No tools loaded.".to_string();
    }

    registry
        .definitions()
        .iter()
        .map(|d| format!("  {:<20} {}", d.name, truncate_string(&d.description, 60)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format session switch message
pub fn format_session_switch(session_id: &str, message_count: usize) -> String {
    if message_count == 0 {
        format!("Switched to new session: {}", session_id)
    } else {
        format!(
            "Switched to session: {} ({} messages)",
            session_id, message_count
        )
    }
}

/// Format interrupt message
pub fn format_interrupt_message() -> String {
    "Interrupted. Type your next message or use /help for commands.".to_string()
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation managers
//!
//! A manager keeps history within bounds after each turn and shrinks it when
//! the provider reports a context overflow.

use crate::config::{ConversationConfig, ConversationManagerKind};
use crate::llm::message::{ContentBlock, Message, MessageContent, Role};

/// Replacement text for a tool result dropped to save context
pub const TRUNCATED_RESULT_NOTICE: &str = "The tool result was too large and has been removed.";

/// Strategy for keeping conversation history within bounds
pub trait ConversationManager: Send + Sync {
    fn name(&self) -> &'static str;

    /// Trim history after a completed turn.
    fn apply_management(&self, messages: &mut Vec<Message>);

    /// Shrink history after a context overflow. Returns false if nothing
    /// could be removed.
    fn reduce_context(&self, messages: &mut Vec<Message>) -> bool;
}

/// Build the manager selected by config.
pub fn build_manager(config: &ConversationConfig) -> Box<dyn ConversationManager> {
    match config.manager {
        ConversationManagerKind::SlidingWindow => Box::new(SlidingWindow::new(
            config.window_size,
            config.should_truncate_results,
        )),
        ConversationManagerKind::Null => Box::new(NullManager),
    }
}

/// Leaves history untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NullManager;

impl ConversationManager for NullManager {
    fn name(&self) -> &'static str {
        "null"
    }

    fn apply_management(&self, _messages: &mut Vec<Message>) {}

    fn reduce_context(&self, _messages: &mut Vec<Message>) -> bool {
        false
    }
}

/// Keeps the most recent `window_size` messages
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindow {
    pub window_size: usize,
    pub should_truncate_results: bool,
}

impl SlidingWindow {
    pub fn new(window_size: usize, should_truncate_results: bool) -> Self {
        Self {
            window_size,
            should_truncate_results,
        }
    }

    /// Replace the oldest untruncated tool result with a notice.
    fn truncate_oldest_result(messages: &mut [Message]) -> bool {
        for message in messages.iter_mut() {
            let MessageContent::Blocks(blocks) = &mut message.content else {
                continue;
            };
            for block in blocks.iter_mut() {
                if let ContentBlock::ToolResult { content, .. } = block {
                    if content != TRUNCATED_RESULT_NOTICE {
                        *content = TRUNCATED_RESULT_NOTICE.to_string();
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Drop everything before `start`. Returns false if no valid
    /// starting message exists at or after `start`.
    fn trim_from(messages: &mut Vec<Message>, start: usize) -> bool {
        match first_valid_start(messages, start) {
            Some(index) if index > 0 => {
                messages.drain(..index);
                true
            }
            _ => false,
        }
    }
}

impl ConversationManager for SlidingWindow {
    fn name(&self) -> &'static str {
        "sliding_window"
    }

    fn apply_management(&self, messages: &mut Vec<Message>) {
        if messages.len() <= self.window_size {
            return;
        }
        let before = messages.len();
        if Self::trim_from(messages, before - self.window_size) {
            tracing::debug!(
                removed = before - messages.len(),
                kept = messages.len(),
                "Sliding window trimmed history"
            );
        }
    }

    fn reduce_context(&self, messages: &mut Vec<Message>) -> bool {
        if self.should_truncate_results && Self::truncate_oldest_result(messages) {
            tracing::debug!("Truncated oldest tool result after context overflow");
            return true;
        }

        let start = if messages.len() > self.window_size {
            messages.len() - self.window_size
        } else {
            2
        };
        let before = messages.len();
        let trimmed = Self::trim_from(messages, start);
        if trimmed {
            tracing::debug!(removed = before - messages.len(), "Dropped oldest messages after context overflow");
        }
        trimmed
    }
}

/// A window may only start on a plain user message so tool use and tool
/// result pairs stay together.
fn first_valid_start(messages: &[Message], from: usize) -> Option<usize> {
    (from..messages.len()).find(|&i| {
        let m = &messages[i];
        m.role == Role::User && !m.is_tool_result()
    })
}

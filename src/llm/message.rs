// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation history types
//!
//! Provider-neutral message model. Adapters reshape it into each vendor's
//! wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One history entry; this is also the session file format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,

    pub role: Role,

    pub content: MessageContent,

    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message (tool results are sent as user messages)
    User,
    Assistant,
}

/// Plain text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Structured message content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },

    /// A call the model wants run
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Output of a tool call, sent back in a user turn
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// Borrowed view of a tool use block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolUse<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a serde_json::Value,
}

impl Message {
    fn with_content(role: Role, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_content(Role::User, MessageContent::Text(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, MessageContent::Text(content.into()))
    }

    /// Assistant turn, possibly carrying tool calls
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::with_content(Role::Assistant, MessageContent::Blocks(blocks))
    }

    /// Create a single tool result message
    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::tool_results(vec![ContentBlock::tool_result(
            tool_use_id,
            content,
            is_error,
        )])
    }

    /// Create a user message carrying several tool results
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self::with_content(Role::User, MessageContent::Blocks(results))
    }

    /// Concatenated text of all text blocks
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Content as blocks, wrapping plain text in a text block
    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.content.clone().into_blocks()
    }

    /// All tool use blocks in the message
    pub fn tool_uses(&self) -> Vec<ToolUse<'_>> {
        match &self.content {
            MessageContent::Text(_) => vec![],
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn has_tool_use(&self) -> bool {
        !self.tool_uses().is_empty()
    }

    /// Whether this is a user message holding tool results
    pub fn is_tool_result(&self) -> bool {
        self.role == Role::User
            && matches!(&self.content, MessageContent::Blocks(blocks)
                if blocks.iter().any(|b| matches!(b, ContentBlock::ToolResult { .. })))
    }
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }
}

impl MessageContent {
    /// Plain text becomes a single text block
    pub fn into_blocks(self) -> Vec<ContentBlock> {
        match self {
            MessageContent::Text(text) => vec![ContentBlock::Text { text }],
            MessageContent::Blocks(blocks) => blocks,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

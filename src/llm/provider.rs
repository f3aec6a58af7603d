// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! The provider seam
//!
//! Every backend turns a [`CompletionRequest`] into one HTTP call and maps
//! the reply onto a [`CompletionResponse`]. Nothing here streams.

use std::ops::AddAssign;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::message::{ContentBlock, Message};

/// A model backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name, as used in model spec prefixes
    fn name(&self) -> &str;

    /// Send the whole conversation and wait for the full reply.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// One model call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Provider-specific model id, without the `provider:` prefix
    pub model: String,
    /// Full history, oldest first
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub max_tokens: u32,
    /// Provider default when unset
    pub temperature: Option<f64>,
    /// Provider default when unset
    pub top_p: Option<f64>,
    /// Empty when no tools are loaded
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

/// A provider reply, normalised across backends
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Backend request or message id
    pub id: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    /// The reply contains tool calls to run
    ToolUse,
    StopSequence,
    /// Blocked by a guardrail or content filter
    ContentFiltered,
}

/// Token counts reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A tool as advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema with `type: object`
    pub input_schema: serde_json::Value,
}

/// Tool selection policy sent with a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    #[default]
    Auto,
    /// Tools are listed but must not be called
    None,
    /// Some tool must be called
    Required,
    /// This tool must be called
    Specific(String),
}

impl CompletionRequest {
    /// Request with 4096 max tokens, no tools and provider sampling defaults.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: 4096,
            temperature: None,
            top_p: None,
            tools: Vec::new(),
            tool_choice: ToolChoice::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }
}

impl CompletionResponse {
    /// Whether the model asked for tools to be run
    pub fn wants_tools(&self) -> bool {
        self.stop_reason == Some(StopReason::ToolUse)
            || self
                .content
                .iter()
                .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// Text blocks joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The reply as an assistant history entry
    pub fn into_message(self) -> Message {
        Message::assistant_blocks(self.content)
    }
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(content: Vec<ContentBlock>, stop_reason: StopReason) -> CompletionResponse {
        CompletionResponse {
            id: "resp-1".to_string(),
            model: "model".to_string(),
            content,
            stop_reason: Some(stop_reason),
            usage: Usage::default(),
        }
    }

    #[test]
    fn test_request_defaults() {
        let request = CompletionRequest::new("gpt-4o", vec![Message::user("Hello")]);

        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.max_tokens, 4096);
        assert_eq!(request.tool_choice, ToolChoice::Auto);
        assert!(request.temperature.is_none());
        assert!(request.top_p.is_none());
    }

    #[test]
    fn test_request_builders() {
        let request = CompletionRequest::new("claude", vec![])
            .with_system("Answer in French.")
            .with_max_tokens(300)
            .with_temperature(0.1)
            .with_top_p(0.8)
            .with_tool_choice(ToolChoice::Specific("weather".to_string()));

        assert_eq!(request.system.as_deref(), Some("Answer in French."));
        assert_eq!(request.max_tokens, 300);
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.top_p, Some(0.8));
        assert_eq!(
            request.tool_choice,
            ToolChoice::Specific("weather".to_string())
        );
    }

    #[test]
    fn test_usage_accumulates() {
        let mut total = Usage::default();
        total += Usage {
            input_tokens: 120,
            output_tokens: 30,
        };
        total += Usage {
            input_tokens: 200,
            output_tokens: 12,
        };

        assert_eq!(total.input_tokens, 320);
        assert_eq!(total.total_tokens(), 362);
    }

    #[test]
    fn test_tool_use_block_wants_tools() {
        // Some backends report end_turn even when tool calls are present
        let response = reply(
            vec![ContentBlock::ToolUse {
                id: "t".to_string(),
                name: "x".to_string(),
                input: serde_json::json!({}),
            }],
            StopReason::EndTurn,
        );
        assert!(response.wants_tools());
        assert!(response.into_message().has_tool_use());
    }

    #[test]
    fn test_text_joins_blocks() {
        let response = reply(
            vec![ContentBlock::text("first"), ContentBlock::text("second")],
            StopReason::EndTurn,
        );
        assert!(!response.wants_tools());
        assert_eq!(response.text(), "first\nsecond");
    }
}

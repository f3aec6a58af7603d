// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI chat completions provider
//!
//! Also serves LiteLLM, which exposes the same API as a proxy in front of
//! other backends.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::common::{ensure_success, trim_base_url};
use crate::error::{ApiError, PalaverError, Result};
use crate::llm::message::{ContentBlock, Message, MessageContent, Role};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, StopReason, ToolChoice, ToolDefinition,
    Usage,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Provider for any OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiProvider {
    client: Client,
    name: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a provider for the OpenAI API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(Some(api_key.into()), OPENAI_API_URL)
    }

    /// Create with a custom base URL; the key is optional for local proxies
    pub fn with_base_url(api_key: Option<String>, base_url: impl AsRef<str>) -> Self {
        Self {
            client: Client::new(),
            name: "openai".to_string(),
            api_key,
            base_url: trim_base_url(base_url.as_ref()),
        }
    }

    /// Report a different provider name (e.g. "litellm")
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Convert internal messages to OpenAI format
    fn convert_messages(messages: &[Message], system: Option<&str>) -> Vec<ChatMessage> {
        let mut result = Vec::new();

        if let Some(sys) = system {
            result.push(ChatMessage::text("system", sys));
        }

        for m in messages {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            let blocks = match &m.content {
                MessageContent::Text(text) => {
                    result.push(ChatMessage::text(role, text));
                    continue;
                }
                MessageContent::Blocks(blocks) => blocks,
            };

            let mut text_parts = Vec::new();
            let mut tool_calls = Vec::new();
            let mut tool_results = Vec::new();

            for block in blocks {
                match block {
                    ContentBlock::Text { text } => text_parts.push(text.clone()),
                    ContentBlock::ToolUse { id, name, input } => tool_calls.push(ChatToolCall {
                        id: id.clone(),
                        r#type: "function".to_string(),
                        function: ChatFunctionCall {
                            name: name.clone(),
                            arguments: input.to_string(),
                        },
                    }),
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => {
                        let content = if *is_error {
                            format!("Error: {}", content)
                        } else {
                            content.clone()
                        };
                        tool_results.push((tool_use_id.clone(), content));
                    }
                }
            }

            if !tool_calls.is_empty() || !text_parts.is_empty() {
                result.push(ChatMessage {
                    role: role.to_string(),
                    content: if text_parts.is_empty() {
                        None
                    } else {
                        Some(text_parts.join("\n"))
                    },
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls)
                    },
                    tool_call_id: None,
                });
            }

            // One `tool` message per result, in request order.
            for (tool_use_id, content) in tool_results {
                result.push(ChatMessage {
                    role: "tool".to_string(),
                    content: Some(content),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id),
                });
            }
        }

        result
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
        tools
            .iter()
            .map(|t| ChatTool {
                r#type: "function".to_string(),
                function: ChatFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    fn build_request(request: &CompletionRequest) -> ChatRequest {
        let tool_choice = if request.tools.is_empty() {
            None
        } else {
            Some(match &request.tool_choice {
                ToolChoice::Auto => serde_json::json!("auto"),
                ToolChoice::None => serde_json::json!("none"),
                ToolChoice::Required => serde_json::json!("required"),
                ToolChoice::Specific(name) => serde_json::json!({
                    "type": "function",
                    "function": { "name": name },
                }),
            })
        };

        ChatRequest {
            model: request.model.clone(),
            messages: Self::convert_messages(&request.messages, request.system.as_deref()),
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            top_p: request.top_p,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(&request.tools))
            },
            tool_choice,
        }
    }

    fn convert_response(api_response: ChatResponse) -> Result<CompletionResponse> {
        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            PalaverError::Api(ApiError::InvalidResponse(
                "No choices in response".to_string(),
            ))
        })?;

        let mut content = Vec::new();

        if let Some(text) = choice.message.content {
            if !text.is_empty() {
                content.push(ContentBlock::Text { text });
            }
        }

        for tc in choice.message.tool_calls.unwrap_or_default() {
            let input = if tc.function.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&tc.function.arguments).map_err(|e| {
                    PalaverError::Api(ApiError::InvalidResponse(format!(
                        "Tool call '{}' has invalid JSON arguments: {}",
                        tc.function.name, e
                    )))
                })?
            };
            content.push(ContentBlock::ToolUse {
                id: tc.id,
                name: tc.function.name,
                input,
            });
        }

        let stop_reason = choice.finish_reason.as_deref().map(|r| match r {
            "length" => StopReason::MaxTokens,
            "tool_calls" | "function_call" => StopReason::ToolUse,
            "content_filter" => StopReason::ContentFiltered,
            _ => StopReason::EndTurn,
        });

        let usage = api_response.usage.unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            content,
            stop_reason,
            usage: Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = Self::build_request(&request);
        tracing::debug!(
            provider = %self.name,
            model = %body.model,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let mut req = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = ensure_success(req.json(&body).send().await?).await?;
        let api_response: ChatResponse = response.json().await?;
        Self::convert_response(api_response)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(text.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    r#type: String,
    function: ChatFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    r#type: String,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

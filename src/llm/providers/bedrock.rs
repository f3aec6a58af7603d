// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Amazon Bedrock Converse API provider
//!
//! Authenticates with a Bedrock API key sent as a bearer token.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{json, Value};

use super::common::ensure_success;
use crate::error::{ApiError, PalaverError, Result};
use crate::llm::message::{ContentBlock, Message, MessageContent, Role};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, StopReason, ToolChoice, ToolDefinition,
    Usage,
};

/// Bedrock runtime provider using the Converse API
pub struct BedrockProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl BedrockProvider {
    /// Create a provider for the given region
    pub fn new(api_key: impl Into<String>, region: &str) -> Self {
        Self::with_base_url(
            api_key,
            format!("https://bedrock-runtime.{}.amazonaws.com", region),
        )
    }

    /// Create with a custom runtime endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// `{base}/model/{model_id}/converse`, with the id encoded as one segment
    fn endpoint(&self, model_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            PalaverError::Config(format!("Invalid Bedrock base_url '{}': {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                PalaverError::Config(format!(
                    "Bedrock base_url '{}' cannot take a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["model", model_id, "converse"]);

        Ok(url)
    }

    fn convert_messages(messages: &[Message]) -> Vec<ConverseMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };

                let content = match &m.content {
                    MessageContent::Text(text) => vec![ConverseBlock::Text(text.clone())],
                    MessageContent::Blocks(blocks) => blocks.iter().map(ConverseBlock::from).collect(),
                };

                ConverseMessage {
                    role: role.to_string(),
                    content,
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition], choice: &ToolChoice) -> Option<ToolConfig> {
        if tools.is_empty() {
            return None;
        }

        let tool_choice = match choice {
            ToolChoice::Auto => Some(json!({ "auto": {} })),
            ToolChoice::Required => Some(json!({ "any": {} })),
            ToolChoice::Specific(name) => Some(json!({ "tool": { "name": name } })),
            // Converse has no "none"; leaving the choice out keeps tool history valid.
            ToolChoice::None => None,
        };

        Some(ToolConfig {
            tools: tools
                .iter()
                .map(|t| ConverseTool {
                    tool_spec: ToolSpec {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        input_schema: json!({ "json": t.input_schema }),
                    },
                })
                .collect(),
            tool_choice,
        })
    }

    fn build_request(request: &CompletionRequest) -> ConverseRequest {
        ConverseRequest {
            messages: Self::convert_messages(&request.messages),
            system: request
                .system
                .as_ref()
                .map(|s| vec![json!({ "text": s })]),
            inference_config: InferenceConfig {
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                top_p: request.top_p,
            },
            tool_config: Self::convert_tools(&request.tools, &request.tool_choice),
        }
    }

    fn convert_response(model_id: &str, request_id: String, body: Value) -> Result<CompletionResponse> {
        let invalid = |what: &str| PalaverError::Api(ApiError::InvalidResponse(what.to_string()));

        let blocks = body
            .pointer("/output/message/content")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("Converse response has no output.message.content"))?;

        let mut content = Vec::new();
        for block in blocks {
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                content.push(ContentBlock::Text {
                    text: text.to_string(),
                });
            } else if let Some(tool_use) = block.get("toolUse") {
                let id = tool_use
                    .get("toolUseId")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("toolUse block without toolUseId"))?;
                let name = tool_use
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("toolUse block without name"))?;
                content.push(ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: tool_use.get("input").cloned().unwrap_or_else(|| json!({})),
                });
            } else {
                tracing::trace!(block = %block, "Skipping unsupported Converse content block");
            }
        }

        let stop_reason = body
            .get("stopReason")
            .and_then(Value::as_str)
            .map(|r| match r {
                "tool_use" => StopReason::ToolUse,
                "max_tokens" => StopReason::MaxTokens,
                "stop_sequence" => StopReason::StopSequence,
                "guardrail_intervened" | "content_filtered" => StopReason::ContentFiltered,
                _ => StopReason::EndTurn,
            });

        let token_count = |key: &str| {
            body.pointer(&format!("/usage/{}", key))
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0)
        };

        Ok(CompletionResponse {
            id: request_id,
            model: model_id.to_string(),
            content,
            stop_reason,
            usage: Usage {
                input_tokens: token_count("inputTokens"),
                output_tokens: token_count("outputTokens"),
            },
        })
    }
}

#[async_trait]
impl LlmProvider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = self.endpoint(&request.model)?;
        let body = Self::build_request(&request);
        tracing::debug!(url = %url, messages = body.messages.len(), "Sending Bedrock Converse request");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let request_id = response
            .headers()
            .get("x-amzn-requestid")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let body: Value = response.json().await?;
        Self::convert_response(&request.model, request_id, body)
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    messages: Vec<ConverseMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<Value>>,
    inference_config: InferenceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Debug, Serialize)]
struct ConverseMessage {
    role: String,
    content: Vec<ConverseBlock>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum ConverseBlock {
    Text(String),
    ToolUse {
        #[serde(rename = "toolUseId")]
        tool_use_id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        #[serde(rename = "toolUseId")]
        tool_use_id: String,
        content: Vec<Value>,
        status: &'static str,
    },
}

impl From<&ContentBlock> for ConverseBlock {
    fn from(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => ConverseBlock::Text(text.clone()),
            ContentBlock::ToolUse { id, name, input } => ConverseBlock::ToolUse {
                tool_use_id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => ConverseBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: vec![json!({ "text": content })],
                status: if *is_error { "error" } else { "success" },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    tools: Vec<ConverseTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseTool {
    tool_spec: ToolSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSpec {
    name: String,
    description: String,
    input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_region() {
        let provider = BedrockProvider::new("k", "eu-central-1");
        let url = provider.endpoint("amazon.nova-pro-v1:0").unwrap();
        assert_eq!(url.host_str(), Some("bedrock-runtime.eu-central-1.amazonaws.com"));
        assert!(url.path().starts_with("/model/amazon.nova-pro-v1"));
        assert!(url.path().ends_with("/converse"));
    }

    #[test]
    fn test_endpoint_encodes_slashes_in_id() {
        let provider = BedrockProvider::with_base_url("k", "http://localhost:9000/");
        let url = provider
            .endpoint("arn:aws:bedrock:us-east-1:123:inference-profile/us.x")
            .unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 3);
        assert!(url.path().contains("%2F"));
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        let provider = BedrockProvider::with_base_url("k", "not a url");
        assert!(provider.endpoint("m").is_err());
    }

    #[test]
    fn test_build_request_shape() {
        let messages = vec![
            Message::user("What's the weather?"),
            Message::assistant_blocks(vec![ContentBlock::ToolUse {
                id: "tu_1".to_string(),
                name: "weather".to_string(),
                input: json!({"city": "Oslo"}),
            }]),
            Message::tool_result("tu_1", "rain", true),
        ];
        let request = CompletionRequest::new("m", messages)
            .with_system("Be brief")
            .with_temperature(0.2)
            .with_tools(vec![ToolDefinition {
                name: "weather".to_string(),
                description: "Weather lookup".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            }]);

        let body = serde_json::to_value(BedrockProvider::build_request(&request)).unwrap();

        assert_eq!(body["system"][0]["text"], "Be brief");
        assert_eq!(body["inferenceConfig"]["maxTokens"], 4096);
        assert_eq!(body["inferenceConfig"]["temperature"], 0.2);
        assert!(body["inferenceConfig"].get("topP").is_none());
        assert_eq!(body["messages"][0]["content"][0]["text"], "What's the weather?");
        assert_eq!(body["messages"][1]["content"][0]["toolUse"]["toolUseId"], "tu_1");
        assert_eq!(body["messages"][1]["content"][0]["toolUse"]["input"]["city"], "Oslo");
        let result = &body["messages"][2]["content"][0]["toolResult"];
        assert_eq!(result["status"], "error");
        assert_eq!(result["content"][0]["text"], "rain");
        let spec = &body["toolConfig"]["tools"][0]["toolSpec"];
        assert_eq!(spec["name"], "weather");
        assert_eq!(spec["inputSchema"]["json"]["type"], "object");
        assert_eq!(body["toolConfig"]["toolChoice"], json!({"auto": {}}));
    }

    #[test]
    fn test_no_tools_omits_tool_config() {
        let request = CompletionRequest::new("m", vec![Message::user("hi")]);
        let body = serde_json::to_value(BedrockProvider::build_request(&request)).unwrap();
        assert!(body.get("toolConfig").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_convert_response() {
        let body = json!({
            "output": {"message": {"role": "assistant", "content": [
                {"text": "Let me check."},
                {"toolUse": {"toolUseId": "tu_2", "name": "weather", "input": {"city": "Bergen"}}},
                {"reasoningContent": {"reasoningText": {"text": "..."}}}
            ]}},
            "stopReason": "tool_use",
            "usage": {"inputTokens": 30, "outputTokens": 9, "totalTokens": 39}
        });

        let response = BedrockProvider::convert_response("m", "req-1".to_string(), body).unwrap();
        assert_eq!(response.id, "req-1");
        assert_eq!(response.content.len(), 2);
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(response.usage.total_tokens(), 39);
    }

    #[test]
    fn test_convert_response_guardrail() {
        let body = json!({
            "output": {"message": {"role": "assistant", "content": []}},
            "stopReason": "guardrail_intervened"
        });
        let response = BedrockProvider::convert_response("m", "r".to_string(), body).unwrap();
        assert_eq!(response.stop_reason, Some(StopReason::ContentFiltered));
    }

    #[test]
    fn test_convert_response_missing_output() {
        assert!(BedrockProvider::convert_response("m", "r".to_string(), json!({})).is_err());
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use palaver::config::{BedrockConfig, EndpointConfig, ProvidersConfig};
use palaver::error::{ApiError, PalaverError};
use palaver::llm::message::{ContentBlock, Message, MessageContent, Role};
use palaver::llm::provider::{CompletionRequest, StopReason, ToolDefinition};
use palaver::llm::{ModelSpec, ProviderFactory, ProviderKind};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn weather_tool() -> ToolDefinition {
    ToolDefinition {
        name: "weather".to_string(),
        description: "Current weather for a city".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }),
    }
}

fn endpoint(base_url: &str) -> EndpointConfig {
    EndpointConfig {
        api_key: Some("test-key".to_string()),
        api_key_env: "PALAVER_TEST_UNSET_KEY_VAR".to_string(),
        base_url: base_url.to_string(),
    }
}

#[test]
fn test_message_user_creation() {
    let message = Message::user("Hello, world!");

    assert_eq!(message.role, Role::User);
    match &message.content {
        MessageContent::Text(text) => assert_eq!(text, "Hello, world!"),
        _ => panic!("Expected text content"),
    }
    assert!(!message.is_tool_result());
}

#[test]
fn test_tool_results_message() {
    let message = Message::tool_results(vec![
        ContentBlock::tool_result("call-1", "sunny", false),
        ContentBlock::tool_result("call-2", "no such city", true),
    ]);

    assert_eq!(message.role, Role::User);
    assert!(message.is_tool_result());
    assert_eq!(message.blocks().len(), 2);
}

#[test]
fn test_assistant_tool_uses() {
    let message = Message::assistant_blocks(vec![
        ContentBlock::text("Let me check."),
        ContentBlock::ToolUse {
            id: "call-1".to_string(),
            name: "weather".to_string(),
            input: json!({"city": "Oslo"}),
        },
    ]);

    assert!(message.has_tool_use());
    let uses = message.tool_uses();
    assert_eq!(uses.len(), 1);
    assert_eq!(uses[0].name, "weather");
    assert_eq!(message.text(), "Let me check.");
}

#[test]
fn test_message_serialization_keeps_blocks() {
    let message = Message::assistant_blocks(vec![ContentBlock::ToolUse {
        id: "call-9".to_string(),
        name: "weather".to_string(),
        input: json!({"city": "Lima"}),
    }]);

    let json = serde_json::to_string(&message).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back.tool_uses()[0].id, "call-9");
}

#[test]
fn test_model_spec_prefixes() {
    let spec = ModelSpec::parse("anthropic:claude-sonnet-4-20250514").unwrap();
    assert_eq!(spec.provider, ProviderKind::Anthropic);
    assert_eq!(spec.model_id, "claude-sonnet-4-20250514");

    // Bedrock ids contain colons of their own
    let spec = ModelSpec::parse("bedrock:amazon.nova-pro-v1:0").unwrap();
    assert_eq!(spec.provider, ProviderKind::Bedrock);
    assert_eq!(spec.model_id, "amazon.nova-pro-v1:0");

    let spec = ModelSpec::parse("us.anthropic.claude-3-haiku-20240307-v1:0").unwrap();
    assert_eq!(spec.provider, ProviderKind::Bedrock);
    assert_eq!(spec.to_string(), "bedrock:us.anthropic.claude-3-haiku-20240307-v1:0");
}

#[test]
fn test_model_spec_rejects_empty() {
    assert!(ModelSpec::parse("").is_err());
    assert!(ModelSpec::parse("openai:").is_err());
}

#[test]
fn test_completion_request_builder() {
    let request = CompletionRequest::new("gpt-4o", vec![Message::user("hi")])
        .with_system("Be brief.")
        .with_max_tokens(256)
        .with_temperature(0.3)
        .with_tools(vec![weather_tool()]);

    assert_eq!(request.system.as_deref(), Some("Be brief."));
    assert_eq!(request.max_tokens, 256);
    assert_eq!(request.temperature, Some(0.3));
    assert_eq!(request.tools.len(), 1);
}

#[tokio::test]
async fn test_openai_text_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{
                "message": {"role": "assistant", "content": "Hi there"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ProviderFactory::create_openai(&endpoint(&server.uri())).unwrap();
    let request = CompletionRequest::new("gpt-4o", vec![Message::user("Hello")]).with_system("Be brief.");
    let response = provider.complete(request).await.unwrap();

    assert_eq!(response.text(), "Hi there");
    assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    assert_eq!(response.usage.input_tokens, 12);
    assert_eq!(response.usage.output_tokens, 3);
    assert!(!response.wants_tools());
}

#[tokio::test]
async fn test_openai_tool_call_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [{"type": "function", "function": {"name": "weather"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-2",
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "weather", "arguments": "{\"city\":\"Oslo\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let provider = ProviderFactory::create_openai(&endpoint(&server.uri())).unwrap();
    let request = CompletionRequest::new("gpt-4o", vec![Message::user("Weather in Oslo?")])
        .with_tools(vec![weather_tool()]);
    let response = provider.complete(request).await.unwrap();

    assert!(response.wants_tools());
    let message = response.into_message();
    let uses = message.tool_uses();
    assert_eq!(uses[0].id, "call_abc");
    assert_eq!(uses[0].input, &json!({"city": "Oslo"}));
}

#[tokio::test]
async fn test_openai_context_overflow_maps_to_context_too_long() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "This model's maximum context length is 8192 tokens.",
                "code": "context_length_exceeded"
            }
        })))
        .mount(&server)
        .await;

    let provider = ProviderFactory::create_openai(&endpoint(&server.uri())).unwrap();
    let err = provider
        .complete(CompletionRequest::new("gpt-4o", vec![Message::user("long")]))
        .await
        .unwrap_err();

    assert!(err.is_context_overflow());
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let provider = ProviderFactory::create_openai(&endpoint(&server.uri())).unwrap();
    let err = provider
        .complete(CompletionRequest::new("gpt-4o", vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, PalaverError::Api(ApiError::RateLimited(7))));
}

#[tokio::test]
async fn test_litellm_without_key_sends_no_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "proxied"}, "finish_reason": "stop"}]
        })))
        .mount(&server)
        .await;

    let mut providers = ProvidersConfig::default();
    providers.litellm = EndpointConfig {
        api_key: None,
        ..endpoint(&server.uri())
    };
    let spec = ModelSpec::parse("litellm:gpt-4o-mini").unwrap();
    let provider = ProviderFactory::create(&spec, &providers).unwrap();

    assert_eq!(provider.name(), "litellm");
    let response = provider
        .complete(CompletionRequest::new(spec.model_id.clone(), vec![Message::user("hi")]))
        .await
        .unwrap();
    assert_eq!(response.text(), "proxied");

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_anthropic_messages_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-sonnet-4-20250514",
            "system": "Be brief.",
            "max_tokens": 4096
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "toolu_1", "name": "weather", "input": {"city": "Rome"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 20, "output_tokens": 9}
        })))
        .mount(&server)
        .await;

    let provider = ProviderFactory::create_anthropic(&endpoint(&server.uri())).unwrap();
    let request = CompletionRequest::new("claude-sonnet-4-20250514", vec![Message::user("Rome?")])
        .with_system("Be brief.")
        .with_tools(vec![weather_tool()]);
    let response = provider.complete(request).await.unwrap();

    assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
    assert_eq!(response.text(), "Checking.");
    assert!(response.wants_tools());
    assert_eq!(response.usage.input_tokens, 20);
}

#[tokio::test]
async fn test_anthropic_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        })))
        .mount(&server)
        .await;

    let provider = ProviderFactory::create_anthropic(&endpoint(&server.uri())).unwrap();
    let err = provider
        .complete(CompletionRequest::new("claude-sonnet-4-20250514", vec![Message::user("hi")]))
        .await
        .unwrap_err();

    match err {
        PalaverError::Api(ApiError::AuthenticationFailed(msg)) => {
            assert_eq!(msg, "invalid x-api-key")
        }
        other => panic!("Expected auth failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bedrock_converse_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/model/[^/]+/converse$"))
        .and(header("authorization", "Bearer bedrock-key"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": [{"text": "Hello"}]}],
            "inferenceConfig": {"maxTokens": 4096}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-amzn-requestid", "req-42")
                .set_body_json(json!({
                    "output": {"message": {"role": "assistant", "content": [{"text": "Hej"}]}},
                    "stopReason": "end_turn",
                    "usage": {"inputTokens": 5, "outputTokens": 1, "totalTokens": 6}
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = BedrockConfig {
        api_key: Some("bedrock-key".to_string()),
        api_key_env: "PALAVER_TEST_UNSET_BEDROCK_VAR".to_string(),
        base_url: Some(server.uri()),
        ..BedrockConfig::default()
    };
    let provider = ProviderFactory::create_bedrock(&config).unwrap();
    let response = provider
        .complete(CompletionRequest::new("amazon.nova-pro-v1:0", vec![Message::user("Hello")]))
        .await
        .unwrap();

    assert_eq!(response.id, "req-42");
    assert_eq!(response.model, "amazon.nova-pro-v1:0");
    assert_eq!(response.text(), "Hej");
    assert_eq!(response.usage.output_tokens, 1);
}

#[tokio::test]
async fn test_bedrock_input_too_long() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/model/[^/]+/converse$"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Input is too long for requested model."
        })))
        .mount(&server)
        .await;

    let config = BedrockConfig {
        api_key: Some("bedrock-key".to_string()),
        base_url: Some(server.uri()),
        ..BedrockConfig::default()
    };
    let provider = ProviderFactory::create_bedrock(&config).unwrap();
    let err = provider
        .complete(CompletionRequest::new("amazon.nova-pro-v1:0", vec![Message::user("x")]))
        .await
        .unwrap_err();

    assert!(err.is_context_overflow());
}

#[tokio::test]
async fn test_missing_model_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "model: claude-nope"}
        })))
        .mount(&server)
        .await;

    let provider = ProviderFactory::create_anthropic(&endpoint(&server.uri())).unwrap();
    let err = provider
        .complete(CompletionRequest::new("claude-nope", vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, PalaverError::Api(ApiError::ModelNotFound(_))));
}

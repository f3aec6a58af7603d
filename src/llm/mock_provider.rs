// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Scripted provider for agent and REPL tests
//!
//! Provides a scripted implementation of the LlmProvider trait that can be
//! used in tests without making real API calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{ApiError, PalaverError, Result};
use crate::llm::message::ContentBlock;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, StopReason, Usage,
};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain text answer
    Text(String),
    /// Tool calls: (name, input)
    ToolCalls(Vec<(String, serde_json::Value)>),
    /// Context overflow error
    ContextTooLong,
    /// Server error with the given status
    ServerError(u16),
    /// No content blocks, as after a guardrail stop
    Empty(StopReason),
}

/// Replays queued replies, then answers "Mock response"
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    call_count: Arc<AtomicUsize>,
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    delay: Option<Duration>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock provider lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl MockProvider {
    /// Create a mock that answers "Mock response" to everything
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
            delay: None,
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.name = name.into();
        provider
    }

    /// Queue a reply
    pub fn then(self, reply: MockReply) -> Self {
        lock(&self.replies).push_back(reply);
        self
    }

    /// Queue a text reply
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.then(MockReply::Text(text.into()))
    }

    /// Queue several text replies (returned in order)
    pub fn with_responses(self, texts: Vec<String>) -> Self {
        texts
            .into_iter()
            .fold(self, |provider, text| provider.with_response(text))
    }

    /// Queue a single tool call reply
    pub fn with_tool_call(self, name: impl Into<String>, input: serde_json::Value) -> Self {
        self.then(MockReply::ToolCalls(vec![(name.into(), input)]))
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request seen, in call order
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        lock(&self.recorded_requests).clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock(&self.recorded_requests).last().cloned()
    }

    /// Forget calls; queued replies are kept
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        lock(&self.recorded_requests).clear();
    }

    fn respond(&self, reply: MockReply, request: &CompletionRequest, call: usize) -> Result<CompletionResponse> {
        let (content, stop_reason) = match reply {
            MockReply::Text(text) => (vec![ContentBlock::Text { text }], StopReason::EndTurn),
            MockReply::ToolCalls(calls) => (
                calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, input))| ContentBlock::ToolUse {
                        id: format!("toolu_mock_{}_{}", call, i),
                        name,
                        input,
                    })
                    .collect(),
                StopReason::ToolUse,
            ),
            MockReply::Empty(stop_reason) => (Vec::new(), stop_reason),
            MockReply::ContextTooLong => {
                return Err(PalaverError::Api(ApiError::ContextTooLong(
                    "prompt is too long".to_string(),
                )))
            }
            MockReply::ServerError(status) => {
                return Err(PalaverError::Api(ApiError::ServerError {
                    status,
                    message: "mock failure".to_string(),
                }))
            }
        };

        Ok(CompletionResponse {
            id: format!("mock-{}", call),
            model: request.model.clone(),
            content,
            stop_reason: Some(stop_reason),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.recorded_requests).push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| MockReply::Text("Mock response".to_string()));
        self.respond(reply, &request, call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Message;

    fn request() -> CompletionRequest {
        CompletionRequest::new("mock-model", vec![Message::user("hi")])
    }

    #[tokio::test]
    async fn test_default_response() {
        let provider = MockProvider::new();
        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.text(), "Mock response");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_sequence() {
        let provider = MockProvider::new()
            .with_tool_call("echo", serde_json::json!({"text": "x"}))
            .with_response("done");

        let first = provider.complete(request()).await.unwrap();
        assert_eq!(first.stop_reason, Some(StopReason::ToolUse));

        let second = provider.complete(request()).await.unwrap();
        assert_eq!(second.text(), "done");
        assert_eq!(provider.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let provider = MockProvider::new().then(MockReply::ContextTooLong);
        let err = provider.complete(request()).await.unwrap_err();
        assert!(err.is_context_overflow());
    }

    #[tokio::test]
    async fn test_reset() {
        let provider = MockProvider::with_name("scripted");
        provider.complete(request()).await.unwrap();
        provider.reset();
        assert_eq!(provider.call_count(), 0);
        assert!(provider.last_request().is_none());
        assert_eq!(provider.name(), "scripted");
    }
}

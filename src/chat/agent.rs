// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Agent loop
//!
//! One user turn sends the conversation to the model, runs any tools it asks
//! for, and repeats until the model answers without requesting tools. History
//! is restored to its pre-turn state when a turn fails or is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::conversation::ConversationManager;
use crate::config::AppConfig;
use crate::error::{PalaverError, Result};
use crate::llm::message::{ContentBlock, Message};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, StopReason, Usage,
};
use crate::tools::ToolRegistry;

/// Request parameters fixed for the lifetime of an agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    /// Provider-specific model id (without the provider prefix)
    pub model_id: String,
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// Maximum model calls per user turn
    pub max_rounds: usize,
}

impl AgentOptions {
    pub fn from_config(config: &AppConfig, model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            system_prompt: config.system_prompt.clone().filter(|s| !s.trim().is_empty()),
            max_tokens: config.model_params.max_tokens,
            temperature: config.model_params.temperature,
            top_p: config.model_params.top_p,
            max_rounds: config.tools.max_rounds,
        }
    }
}

/// Callbacks fired while a turn runs
pub trait AgentObserver: Send {
    fn on_tool_invocation(&mut self, _name: &str, _input: &Value) {}

    fn on_tool_result(&mut self, _name: &str, _result: &ContentBlock) {}

    /// History was shrunk after a context overflow
    fn on_context_reduced(&mut self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed {
        /// Text of the final assistant message
        text: String,
        /// Model calls made
        rounds: usize,
        usage: Usage,
    },
    Cancelled,
}

/// Saved history, used to undo a turn
#[derive(Debug, Clone)]
pub struct Checkpoint(Vec<Message>);

/// Conversation state plus everything needed to run a turn
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    manager: Box<dyn ConversationManager>,
    options: AgentOptions,
    messages: Vec<Message>,
    cancel: Arc<AtomicBool>,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        manager: Box<dyn ConversationManager>,
        options: AgentOptions,
    ) -> Self {
        Self {
            provider,
            tools,
            manager,
            options,
            messages: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replace the history (used when switching sessions).
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn manager_name(&self) -> &'static str {
        self.manager.name()
    }

    /// Flag checked between awaited operations; set it to cancel a turn.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.messages.clone())
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.messages = checkpoint.0;
    }

    /// Run one user turn.
    ///
    /// On error or cancellation history is restored; on success the
    /// conversation manager's window is applied.
    pub async fn run_turn(
        &mut self,
        input: &str,
        observer: &mut dyn AgentObserver,
    ) -> Result<TurnOutcome> {
        self.cancel.store(false, Ordering::SeqCst);
        let checkpoint = self.checkpoint();
        self.messages.push(Message::user(input));

        match self.run_rounds(observer).await {
            Ok(TurnOutcome::Cancelled) => {
                tracing::debug!("Turn cancelled, restoring history");
                self.restore(checkpoint);
                Ok(TurnOutcome::Cancelled)
            }
            Ok(outcome) => {
                self.manager.apply_management(&mut self.messages);
                Ok(outcome)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Turn failed, restoring history");
                self.restore(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_rounds(&mut self, observer: &mut dyn AgentObserver) -> Result<TurnOutcome> {
        let mut usage = Usage::default();

        for round in 1..=self.options.max_rounds {
            if self.is_cancelled() {
                return Ok(TurnOutcome::Cancelled);
            }

            let response = self.complete_with_reduction(observer).await?;
            usage += response.usage;

            if self.is_cancelled() {
                return Ok(TurnOutcome::Cancelled);
            }

            let wants_tools = response.wants_tools();
            let stop_reason = response.stop_reason;
            let mut blocks = response.content;
            blocks.retain(|b| !matches!(b, ContentBlock::Text { text } if text.trim().is_empty()));
            if blocks.is_empty() {
                tracing::warn!(?stop_reason, "Model returned no content");
                blocks.push(ContentBlock::text(empty_reply_notice(stop_reason)));
            }
            let message = Message::assistant_blocks(blocks);
            let text = message.text();
            let calls: Vec<(String, String, Value)> = message
                .tool_uses()
                .into_iter()
                .map(|u| (u.id.to_string(), u.name.to_string(), u.input.clone()))
                .collect();
            self.messages.push(message);

            if !wants_tools || calls.is_empty() {
                return Ok(TurnOutcome::Completed {
                    text,
                    rounds: round,
                    usage,
                });
            }

            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in calls {
                if self.is_cancelled() {
                    return Ok(TurnOutcome::Cancelled);
                }
                observer.on_tool_invocation(&name, &input);
                let result = self.tools.execute(&id, &name, input).await;
                observer.on_tool_result(&name, &result);
                results.push(result);
            }
            self.messages.push(Message::tool_results(results));
        }

        Err(PalaverError::ToolExecution(format!(
            "Stopped after {} model calls without a final answer (tools.max_rounds)",
            self.options.max_rounds
        )))
    }

    /// Call the model, shrinking history and retrying on context overflow.
    async fn complete_with_reduction(
        &mut self,
        observer: &mut dyn AgentObserver,
    ) -> Result<CompletionResponse> {
        loop {
            match self.provider.complete(self.build_request()).await {
                Err(e) if e.is_context_overflow() => {
                    if !self.manager.reduce_context(&mut self.messages) {
                        return Err(e);
                    }
                    tracing::info!("Context overflow, retrying with reduced history");
                    observer.on_context_reduced();
                }
                other => return other,
            }
        }
    }

    fn build_request(&self) -> CompletionRequest {
        let mut request = CompletionRequest::new(&self.options.model_id, self.messages.clone())
            .with_max_tokens(self.options.max_tokens)
            .with_tools(self.tools.definitions());
        if let Some(system) = &self.options.system_prompt {
            request = request.with_system(system);
        }
        if let Some(t) = self.options.temperature {
            request = request.with_temperature(t);
        }
        if let Some(p) = self.options.top_p {
            request = request.with_top_p(p);
        }
        request
    }
}

/// Stands in for an empty reply; providers reject empty assistant content.
fn empty_reply_notice(stop_reason: Option<StopReason>) -> &'static str {
    match stop_reason {
        Some(StopReason::ContentFiltered) => "[No response: blocked by a content filter]",
        Some(StopReason::MaxTokens) => "[No response: token limit reached]",
        _ => "[No response]",
    }
}

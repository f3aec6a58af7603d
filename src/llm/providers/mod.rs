// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM provider implementations

pub mod anthropic;
pub mod bedrock;
pub(crate) mod common;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use bedrock::BedrockProvider;
pub use openai::OpenAiProvider;

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Palaver - a command-line chat client for language models.
//!
//! This crate exposes the runtime used by the `palaver` CLI (`src/main.rs`).
//!
//! Architecture highlights:
//! - `config`: YAML profiles with inheritance, `${NAME}` substitution and
//!   layered overrides (built-in < defaults < profile < CLI < env)
//! - `llm`: provider abstraction and adapters (Bedrock/OpenAI/Anthropic/LiteLLM)
//! - `tools`: `*.tools.json` plugin discovery and JSON-RPC execution
//! - `session`: file-based session persistence with switch-now
//! - `chat`: agent loop, conversation managers, REPL helpers

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod tools;

pub use error::{PalaverError, Result};

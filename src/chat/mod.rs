// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session management
//!
//! The agent loop, conversation managers, and the REPL's command parsing
//! and output formatting.

pub mod agent;
pub mod commands;
pub mod conversation;
pub mod display;

pub use agent::{Agent, AgentObserver, AgentOptions, Checkpoint, NoopObserver, TurnOutcome};
pub use commands::{parse_command, ChatCommand};
pub use conversation::{build_manager, ConversationManager, NullManager, SlidingWindow};

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Global flags map one to one onto configuration fields; see
//! [`Cli::to_overrides`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ConfigOverrides, ConversationManagerKind};

/// Palaver - chat with language models from your terminal
#[derive(Parser, Debug)]
#[command(name = "palaver")]
#[command(version, about = "Chat with language models from your terminal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile from the config file
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Model spec, e.g. openai:gpt-4o or bedrock:<model-id>
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// System prompt
    #[arg(long, global = true)]
    pub system_prompt: Option<String>,

    /// Session to open (created if missing)
    #[arg(short, long, global = true)]
    pub session: Option<String>,

    /// Conversation manager: sliding_window or null
    #[arg(long, global = true, value_parser = parse_manager)]
    pub conversation_manager: Option<ConversationManagerKind>,

    /// Messages kept by the sliding window
    #[arg(long, global = true)]
    pub window_size: Option<usize>,

    /// Truncate tool results before dropping messages on overflow
    #[arg(long, global = true, value_name = "BOOL")]
    pub truncate_results: Option<bool>,

    /// Maximum tokens per response
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long, global = true)]
    pub temperature: Option<f64>,

    /// Tool manifest file or directory (repeatable)
    #[arg(long = "tools-path", global = true, value_name = "PATH")]
    pub tools_paths: Vec<PathBuf>,

    /// Input prompt string
    #[arg(long, global = true)]
    pub prompt: Option<String>,

    /// Text printed before each reply
    #[arg(long, global = true)]
    pub assistant_prefix: Option<String>,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Show full error details
    #[arg(long, global = true)]
    pub debug: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start interactive chat session (default when no command given)
    Chat,

    /// Ask a single question and print the answer
    Ask(AskArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Manage saved sessions
    #[command(subcommand)]
    Sessions(SessionsCommands),

    /// Inspect tool plugins
    #[command(subcommand)]
    Tools(ToolsCommands),
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct AskArgs {
    /// The question; `-` reads it from stdin
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}

impl AskArgs {
    /// Words joined back into one prompt
    pub fn text(&self) -> String {
        self.prompt.join(" ")
    }

    pub fn reads_stdin(&self) -> bool {
        self.prompt.len() == 1 && self.prompt[0] == "-"
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigCommands {
    /// Print the resolved configuration as YAML
    Show,
    /// List profiles in the config file
    Profiles,
    /// Print which config file was used
    Path,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SessionsCommands {
    /// List saved sessions
    List,
    /// Delete a saved session
    Delete {
        /// Session id
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ToolsCommands {
    /// List loaded tools
    List,
}

fn parse_manager(s: &str) -> Result<ConversationManagerKind, String> {
    s.parse().map_err(|e: crate::error::PalaverError| e.to_string())
}

impl Cli {
    /// Flags that override configuration.
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            session: self.session.clone(),
            conversation_manager: self.conversation_manager,
            window_size: self.window_size,
            truncate_results: self.truncate_results,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools_paths: self.tools_paths.clone(),
            prompt: self.prompt.clone(),
            assistant_prefix: self.assistant_prefix.clone(),
            no_color: self.no_color,
            debug: self.debug,
        }
    }

    /// The subcommand, defaulting to chat
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }
}

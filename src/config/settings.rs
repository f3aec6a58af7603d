// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Typed application configuration
//!
//! `AppConfig` is the typed view of the fully merged configuration mapping.
//! Its `Default` impl is the built-in defaults layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PalaverError, Result};

/// Fully resolved application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Model spec, `<provider>:<model_id>` or a bare Bedrock model id
    pub model: String,

    /// Sampling and length parameters
    pub model_params: ModelParams,

    /// System prompt sent with every request
    pub system_prompt: Option<String>,

    /// Provider endpoints and credentials
    pub providers: ProvidersConfig,

    /// Session persistence
    pub session: SessionConfig,

    /// Conversation history management
    pub conversation: ConversationConfig,

    /// External tool plugins
    pub tools: ToolsConfig,

    /// Interactive prompt strings and display toggles
    pub ui: UiConfig,

    /// Show full error chains for provider and user errors
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            model_params: ModelParams::default(),
            system_prompt: None,
            providers: ProvidersConfig::default(),
            session: SessionConfig::default(),
            conversation: ConversationConfig::default(),
            tools: ToolsConfig::default(),
            ui: UiConfig::default(),
            debug: false,
        }
    }
}

/// Sampling and length parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelParams {
    /// Maximum tokens for response
    pub max_tokens: u32,
    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f64>,
    /// Nucleus sampling (provider default when unset)
    pub top_p: Option<f64>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: None,
            top_p: None,
        }
    }
}

/// Configuration for every supported provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub bedrock: BedrockConfig,
    pub openai: EndpointConfig,
    pub anthropic: EndpointConfig,
    pub litellm: EndpointConfig,
}

impl ProvidersConfig {
    fn default_openai() -> EndpointConfig {
        EndpointConfig {
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    fn default_anthropic() -> EndpointConfig {
        EndpointConfig {
            api_key: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    fn default_litellm() -> EndpointConfig {
        EndpointConfig {
            api_key: None,
            api_key_env: "LITELLM_API_KEY".to_string(),
            base_url: "http://localhost:4000".to_string(),
        }
    }
}

/// Bedrock runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BedrockConfig {
    /// AWS region (falls back to `AWS_REGION`, then us-east-1)
    pub region: Option<String>,

    /// Bedrock API key (if stored directly, not recommended)
    pub api_key: Option<String>,

    /// Environment variable holding the Bedrock API key
    pub api_key_env: String,

    /// Override for the runtime endpoint
    pub base_url: Option<String>,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: None,
            api_key: None,
            api_key_env: "AWS_BEARER_TOKEN_BEDROCK".to_string(),
            base_url: None,
        }
    }
}

impl BedrockConfig {
    /// Region to call, honouring `AWS_REGION` when none is configured.
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .unwrap_or_else(|| "us-east-1".to_string())
    }

    /// Runtime endpoint for the effective region
    pub fn effective_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            format!(
                "https://bedrock-runtime.{}.amazonaws.com",
                self.effective_region()
            )
        })
    }

    /// Get the API key, checking the env var first.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }
}

/// Endpoint configuration for HTTP providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    /// API key (if stored directly, not recommended)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default)]
    pub api_key_env: String,

    /// Base URL for API
    #[serde(default)]
    pub base_url: String,
}

impl EndpointConfig {
    /// Get the API key, checking the env var first.
    pub fn resolve_api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }
}

/// Session persistence settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Session to open at startup; none means an unsaved conversation
    pub name: Option<String>,
    /// Directory holding session files
    pub dir: PathBuf,
    /// Whether sessions are persisted at all
    pub enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: None,
            dir: palaver_home().join("sessions"),
            enabled: true,
        }
    }
}

/// Which conversation manager trims history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationManagerKind {
    #[default]
    SlidingWindow,
    Null,
}

impl std::str::FromStr for ConversationManagerKind {
    type Err = PalaverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sliding_window" => Ok(Self::SlidingWindow),
            "null" | "none" => Ok(Self::Null),
            other => Err(PalaverError::InvalidInput(format!(
                "Unknown conversation manager '{}' (expected sliding_window or null)",
                other
            ))),
        }
    }
}

/// Conversation manager parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationConfig {
    pub manager: ConversationManagerKind,
    /// Maximum messages kept by the sliding window
    pub window_size: usize,
    /// Truncate tool results before dropping messages on overflow
    pub should_truncate_results: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            manager: ConversationManagerKind::SlidingWindow,
            window_size: 40,
            should_truncate_results: true,
        }
    }
}

/// External tool plugin settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Whether manifests are loaded at all
    pub enabled: bool,
    /// Files or directories to scan for `*.tools.json`
    pub paths: Vec<PathBuf>,
    /// Default per-call timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum model/tool round trips per user turn
    pub max_rounds: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            paths: vec![palaver_home().join("tools"), PathBuf::from(".palaver/tools")],
            timeout_ms: 30_000,
            max_rounds: 25,
        }
    }
}

/// Interactive prompt strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Input prompt
    pub prompt: String,
    /// Printed before each assistant reply
    pub assistant_prefix: String,
    /// Banner printed when the REPL starts
    pub welcome: Option<String>,
    /// Printed on exit
    pub goodbye: String,
    pub show_tool_calls: bool,
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            assistant_prefix: String::new(),
            welcome: None,
            goodbye: "Goodbye!".to_string(),
            show_tool_calls: true,
            color: true,
        }
    }
}

fn default_model() -> String {
    "bedrock:us.anthropic.claude-sonnet-4-20250514-v1:0".to_string()
}

/// Environment variable overriding the palaver home directory
pub const HOME_ENV: &str = "PALAVER_HOME";

/// The palaver home directory: `override_dir` if set, else `<home>/.palaver`.
pub fn palaver_home_from(override_dir: Option<&str>, home: Option<&Path>) -> PathBuf {
    match override_dir.filter(|d| !d.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home.unwrap_or_else(|| Path::new(".")).join(".palaver"),
    }
}

/// The palaver home directory for this process.
pub fn palaver_home() -> PathBuf {
    palaver_home_from(
        std::env::var(HOME_ENV).ok().as_deref(),
        dirs::home_dir().as_deref(),
    )
}

impl AppConfig {
    /// Built-in defaults with paths rooted at `palaver_home`.
    pub fn builtin(palaver_home: &Path) -> Self {
        let mut config = Self::default();
        config.session.dir = palaver_home.join("sessions");
        config.tools.paths = vec![palaver_home.join("tools"), PathBuf::from(".palaver/tools")];
        config
    }

    /// Check the values serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(PalaverError::Config("model cannot be empty".to_string()));
        }
        if self.model_params.max_tokens == 0 {
            return Err(PalaverError::Config(
                "model_params.max_tokens must be greater than zero".to_string(),
            ));
        }
        if let Some(t) = self.model_params.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(PalaverError::Config(format!(
                    "model_params.temperature must be between 0 and 2, got {}",
                    t
                )));
            }
        }
        if self.conversation.manager == ConversationManagerKind::SlidingWindow
            && self.conversation.window_size < 2
        {
            return Err(PalaverError::Config(
                "conversation.window_size must be at least 2".to_string(),
            ));
        }
        if self.tools.max_rounds == 0 {
            return Err(PalaverError::Config(
                "tools.max_rounds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            bedrock: BedrockConfig::default(),
            openai: Self::default_openai(),
            anthropic: Self::default_anthropic(),
            litellm: Self::default_litellm(),
        }
    }
}

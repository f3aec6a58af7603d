// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model spec parsing
//!
//! A model spec is `<provider>:<model_id>`. Bedrock model ids contain colons
//! themselves (`anthropic.claude-3-5-sonnet-20240620-v1:0`), so a string whose
//! prefix is not a known provider is taken as a Bedrock id in full.

use std::fmt;
use std::str::FromStr;

use crate::error::{PalaverError, Result};

/// Supported model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Bedrock,
    OpenAi,
    Anthropic,
    LiteLlm,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Bedrock,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::LiteLlm,
    ];

    /// Prefix used in model specs
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Bedrock => "bedrock",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::LiteLlm => "litellm",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == prefix)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `<provider>:<model_id>` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
}

impl ModelSpec {
    pub fn new(provider: ProviderKind, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(PalaverError::InvalidInput(
                "Model spec cannot be empty".to_string(),
            ));
        }

        if let Some((prefix, rest)) = spec.split_once(':') {
            if let Some(provider) = ProviderKind::from_prefix(prefix) {
                if rest.is_empty() {
                    return Err(PalaverError::InvalidInput(format!(
                        "Model spec '{}' is missing a model id after '{}:'",
                        spec, prefix
                    )));
                }
                return Ok(Self::new(provider, rest));
            }
        }

        Ok(Self::new(ProviderKind::Bedrock, spec))
    }
}

impl FromStr for ModelSpec {
    type Err = PalaverError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model_id)
    }
}

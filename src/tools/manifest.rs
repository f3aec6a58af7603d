// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool manifest parsing
//!
//! A `*.tools.json` file holds one tool, an array of tools, or an object
//! with a `tools` array:
//!
//! ```json
//! {
//!   "tools": [{
//!     "name": "weather",
//!     "description": "Current weather for a city",
//!     "command": ["python3", "~/.palaver/tools/weather.py"],
//!     "input_schema": {
//!       "type": "object",
//!       "properties": { "city": { "type": "string" } },
//!       "required": ["city"]
//!     },
//!     "timeout_ms": 10000
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{PalaverError, Result};
use crate::llm::provider::ToolDefinition;

/// Manifest for one external tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    /// Tool name (must be unique, used by LLM to invoke)
    pub name: String,

    /// Human-readable description for the LLM
    pub description: String,

    /// Command to execute the tool (first element is program, rest are args)
    pub command: Vec<String>,

    /// JSON Schema for tool input
    pub input_schema: serde_json::Value,

    /// Per-call timeout; falls back to `tools.timeout_ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Working directory for the tool (default: current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Environment variables to pass to the tool
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

/// The three accepted file shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Wrapped { tools: Vec<ToolManifest> },
    Many(Vec<ToolManifest>),
    One(Box<ToolManifest>),
}

impl ToolManifest {
    /// Load every manifest in a file.
    pub fn from_file(path: &Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PalaverError::Config(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;

        Self::parse_all(&content)
    }

    /// Parse and validate a manifest file's contents.
    pub fn parse_all(json: &str) -> Result<Vec<Self>> {
        let file: ManifestFile = serde_json::from_str(json)
            .map_err(|e| PalaverError::Config(format!("Failed to parse tool manifest: {}", e)))?;

        let manifests = match file {
            ManifestFile::Wrapped { tools } | ManifestFile::Many(tools) => tools,
            ManifestFile::One(tool) => vec![*tool],
        };

        for manifest in &manifests {
            manifest.validate()?;
        }
        Ok(manifests)
    }

    /// Validate the manifest.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PalaverError::Config(
                "Tool manifest: name cannot be empty".to_string(),
            ));
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(PalaverError::Config(format!(
                "Tool manifest: name '{}' may only contain letters, digits, '_' and '-'",
                self.name
            )));
        }

        if self.description.trim().is_empty() {
            return Err(PalaverError::Config(format!(
                "Tool manifest '{}': description cannot be empty",
                self.name
            )));
        }

        if self.command.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(PalaverError::Config(format!(
                "Tool manifest '{}': command cannot be empty",
                self.name
            )));
        }

        if self.input_schema.get("type").and_then(|t| t.as_str()) != Some("object") {
            return Err(PalaverError::Config(format!(
                "Tool manifest '{}': input_schema type must be 'object'",
                self.name
            )));
        }

        Ok(())
    }

    /// Convert to a ToolDefinition for the LLM.
    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Expand ~ in command paths to actual home directory.
    pub fn expand_command(&self) -> Vec<String> {
        self.command.iter().map(|arg| expand_tilde(arg)).collect()
    }

    /// Get the expanded working directory.
    pub fn expand_working_directory(&self) -> Option<PathBuf> {
        self.working_directory
            .as_deref()
            .map(|dir| PathBuf::from(expand_tilde(dir)))
    }
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).display().to_string();
        }
    }
    path.to_string()
}

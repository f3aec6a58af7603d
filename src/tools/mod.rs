// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool plugins for Palaver
//!
//! Tools are external commands described by `*.tools.json` manifests. They
//! are discovered from `tools.paths` at startup, offered to the model, and
//! executed over a one-shot JSON-RPC exchange on stdio.
//!
//! See the [`protocol`] module for the wire format.

pub mod external;
pub mod loader;
pub mod manifest;
pub mod protocol;

pub use external::ExternalTool;
pub use loader::ToolLoader;
pub use manifest::ToolManifest;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::llm::message::ContentBlock;
use crate::llm::provider::ToolDefinition;

/// Output from a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text handed back to the model
    pub content: String,
    /// Whether the tool reported a failure
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful output
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error output
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Trait for implementing tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool definition for the LLM
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given input
    async fn execute(&self, input: Value) -> Result<ToolOutput>;
}

/// Registry of available tools, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `tools` config section.
    pub fn load(config: &ToolsConfig) -> Self {
        if !config.enabled {
            tracing::debug!("Tools disabled");
            return Self::new();
        }
        let manifests = ToolLoader::new(&config.paths).load_all();
        Self::from_manifests(manifests, config.timeout_ms)
    }

    /// Wrap manifests as external tools.
    pub fn from_manifests(
        manifests: impl IntoIterator<Item = ToolManifest>,
        default_timeout_ms: u64,
    ) -> Self {
        let mut registry = Self::new();
        for manifest in manifests {
            registry.register(Arc::new(ExternalTool::new(manifest, default_timeout_ms)));
        }
        registry
    }

    /// Register a tool. Returns false if the name is already taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            tracing::warn!(tool = %name, "Tool already registered, ignoring duplicate");
            return false;
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        true
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.definition())
            .collect()
    }

    /// List all tool names
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Run a tool and turn the outcome into a tool result block.
    ///
    /// Failures become error results so the model can see them.
    pub async fn execute(&self, tool_use_id: &str, name: &str, input: Value) -> ContentBlock {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = %name, "Model requested an unknown tool");
            return ContentBlock::tool_result(tool_use_id, format!("Unknown tool: {}", name), true);
        };

        tracing::debug!(tool = %name, id = %tool_use_id, "Executing tool");
        match tool.execute(input).await {
            Ok(output) => ContentBlock::tool_result(tool_use_id, output.content, output.is_error),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool failed");
                ContentBlock::tool_result(tool_use_id, e.to_string(), true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PalaverError;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Echo input".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, input: Value) -> Result<ToolOutput> {
            Ok(ToolOutput::success(input.to_string()))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "broken".to_string(),
                description: "Always fails".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutput> {
            Err(PalaverError::ToolExecution("boom".to_string()))
        }
    }

    fn result_parts(block: ContentBlock) -> (String, String, bool) {
        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => (tool_use_id, content, is_error),
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[test]
    fn test_register_keeps_order_and_rejects_duplicates() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(Arc::new(EchoTool)));
        assert!(registry.register(Arc::new(BrokenTool)));
        assert!(!registry.register(Arc::new(EchoTool)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["echo", "broken"]);
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn test_execute_success() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let (id, content, is_error) =
            result_parts(registry.execute("t1", "echo", json!({"a": 1})).await);
        assert_eq!(id, "t1");
        assert_eq!(content, r#"{"a":1}"#);
        assert!(!is_error);
    }

    #[tokio::test]
    async fn test_execute_failure_becomes_error_result() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(BrokenTool));

        let (_, content, is_error) = result_parts(registry.execute("t2", "broken", json!({})).await);
        assert!(is_error);
        assert!(content.contains("boom"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let (_, content, is_error) = result_parts(registry.execute("t3", "nope", json!({})).await);
        assert!(is_error);
        assert_eq!(content, "Unknown tool: nope");
    }

    #[test]
    fn test_load_disabled() {
        let config = ToolsConfig {
            enabled: false,
            ..ToolsConfig::default()
        };
        assert!(ToolRegistry::load(&config).is_empty());
    }

    #[test]
    fn test_load_from_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("greet.tools.json"),
            r#"{"name": "greet", "description": "Say hi", "command": ["echo", "hi"],
                "input_schema": {"type": "object"}}"#,
        )
        .unwrap();

        let config = ToolsConfig {
            paths: vec![temp.path().to_path_buf()],
            ..ToolsConfig::default()
        };
        let registry = ToolRegistry::load(&config);
        assert_eq!(registry.names(), vec!["greet"]);
    }
}

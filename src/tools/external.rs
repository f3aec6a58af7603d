// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! External tool execution
//!
//! Each call spawns the manifest's command, writes one JSON-RPC request to
//! stdin and reads the response from stdout. The process is killed when the
//! timeout expires.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::manifest::ToolManifest;
use super::protocol::{parse_output, Request};
use super::{Tool, ToolOutput};
use crate::error::{PalaverError, Result};
use crate::llm::provider::ToolDefinition;

/// Global request ID counter for JSON-RPC
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// An external tool loaded from a manifest.
pub struct ExternalTool {
    manifest: ToolManifest,
    timeout: Duration,
}

impl ExternalTool {
    /// Create a tool; `default_timeout_ms` applies when the manifest sets none.
    pub fn new(manifest: ToolManifest, default_timeout_ms: u64) -> Self {
        let timeout = Duration::from_millis(manifest.timeout_ms.unwrap_or(default_timeout_ms));
        Self { manifest, timeout }
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, input: Value) -> Result<ToolOutput> {
        let command = self.manifest.expand_command();
        let Some((program, args)) = command.split_first() else {
            return Err(PalaverError::ToolExecution("Empty command".to_string()));
        };

        let request_id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        let request_line = Request::execute(input, request_id).to_json()?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&self.manifest.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.manifest.expand_working_directory() {
            cmd.current_dir(dir);
        }

        tracing::debug!(tool = %self.manifest.name, program = %program, id = request_id, "Spawning external tool");

        let mut child = cmd.spawn().map_err(|e| {
            PalaverError::ToolExecution(format!(
                "Failed to spawn external tool '{}': {}",
                self.manifest.name, e
            ))
        })?;

        let stdin = child.stdin.take();
        let name = &self.manifest.name;
        let write_request = async move {
            let Some(mut stdin) = stdin else {
                return;
            };
            // A tool may exit without reading its input; that is not an error here.
            let written = async {
                stdin.write_all(request_line.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.shutdown().await
            }
            .await;
            if let Err(e) = written {
                tracing::debug!(tool = %name, error = %e, "Could not write tool request");
            }
        };

        // Writing the request counts against the timeout too.
        // Dropping the child on timeout kills it (kill_on_drop).
        let exchange = async {
            let ((), output) = tokio::join!(write_request, child.wait_with_output());
            output
        };
        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                PalaverError::ToolExecution(format!(
                    "External tool '{}' timed out after {}ms",
                    self.manifest.name,
                    self.timeout.as_millis()
                ))
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PalaverError::ToolExecution(format!(
                "External tool '{}' failed with exit code {:?}: {}",
                self.manifest.name,
                output.status.code(),
                stderr.trim()
            )));
        }

        let mut result = parse_output(&stdout);
        if !output.status.success() {
            result.is_error = true;
        }
        Ok(result)
    }
}

#[async_trait]
impl Tool for ExternalTool {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn definition(&self) -> ToolDefinition {
        self.manifest.to_tool_definition()
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        self.run(input).await
    }
}

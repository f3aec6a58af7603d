// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Line-delimited JSON-RPC 2.0 spoken with tool processes
//!
//! One request line is written to the tool's stdin:
//!
//! ```json
//! {"jsonrpc": "2.0", "method": "execute", "params": { /* tool input */ }, "id": 1}
//! ```
//!
//! The first line of stdout is the response:
//!
//! ```json
//! {"jsonrpc": "2.0", "result": {"output": "text", "is_error": false}, "id": 1}
//! {"jsonrpc": "2.0", "error": {"code": -32000, "message": "what went wrong"}, "id": 1}
//! ```
//!
//! A tool that prints something other than a JSON-RPC response has its
//! stdout passed through as plain output.

use serde::{Deserialize, Serialize};

use super::ToolOutput;

/// The single line written to a tool's stdin
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    /// Always `execute`
    pub method: &'static str,
    /// The model's tool input, passed through
    pub params: serde_json::Value,
    pub id: u64,
}

impl Request {
    pub fn execute(params: serde_json::Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "execute",
            params,
            id,
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// First non-empty stdout line, when it is JSON-RPC
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub result: Option<ResultPayload>,
    /// Protocol-level failure
    pub error: Option<ErrorPayload>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl Response {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.result.as_ref().is_some_and(|r| r.is_error)
    }

    /// Text for the tool result block
    pub fn output(&self) -> String {
        if let Some(error) = &self.error {
            error.message.clone()
        } else if let Some(result) = &self.result {
            result.output.clone()
        } else {
            "No output".to_string()
        }
    }

    fn is_rpc(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultPayload {
    #[serde(default)]
    pub output: String,

    /// Tool ran but reports failure
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// Interpret a tool's stdout.
pub fn parse_output(stdout: &str) -> ToolOutput {
    let first_line = stdout.lines().find(|l| !l.trim().is_empty()).unwrap_or("");

    match Response::parse(first_line.trim()) {
        Ok(response) if response.is_rpc() => ToolOutput {
            content: response.output(),
            is_error: response.is_error(),
        },
        _ => ToolOutput::success(stdout.trim_end()),
    }
}

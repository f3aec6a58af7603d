// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for palaver
//!
//! Errors fall into three categories that drive how they are reported:
//! provider failures, user mistakes, and internal faults.

use thiserror::Error;

/// Main error type for palaver operations
#[derive(Error, Debug)]
pub enum PalaverError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Transport failure before a status was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bad or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A requested profile does not exist in the config file
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// `inherits` chain loops back on itself
    #[error("Profile inheritance cycle: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<String>),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Bad flag values, empty prompts
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid session ids and unreadable session files
    #[error("Session error: {0}")]
    Session(String),

    /// Tool processes that fail to start or exceed their budget
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bugs: states the program should never reach
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures reported by a model backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid or missing credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// 429; seconds to wait
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The prompt no longer fits the model's window
    #[error("Context too long: {0}")]
    ContextTooLong(String),

    /// The body did not have the expected shape
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Provider call failed
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },
}

/// How an error should be reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network/API failures from the model backend
    Provider,
    /// Bad paths, unknown profiles, malformed config
    User,
    /// Bugs; always reported with the full chain
    System,
}

impl PalaverError {
    /// Classify the error for reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            PalaverError::Api(_) | PalaverError::Http(_) => ErrorCategory::Provider,
            PalaverError::Config(_)
            | PalaverError::ProfileNotFound(_)
            | PalaverError::InheritanceCycle(_)
            | PalaverError::Yaml(_)
            | PalaverError::InvalidInput(_)
            | PalaverError::Session(_)
            | PalaverError::ToolExecution(_) => ErrorCategory::User,
            PalaverError::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    ErrorCategory::User
                }
                _ => ErrorCategory::System,
            },
            PalaverError::Json(_) | PalaverError::Internal(_) => ErrorCategory::System,
        }
    }

    /// Whether this error signals that the prompt no longer fits the model's window
    pub fn is_context_overflow(&self) -> bool {
        matches!(self, PalaverError::Api(ApiError::ContextTooLong(_)))
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::User => 2,
            ErrorCategory::Provider | ErrorCategory::System => 1,
        }
    }
}

/// Result type alias for palaver operations
pub type Result<T> = std::result::Result<T, PalaverError>;

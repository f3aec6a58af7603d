// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use palaver::error::{ApiError, ErrorCategory, PalaverError};

#[test]
fn test_config_error_display() {
    let err = PalaverError::Config("Missing API key".to_string());
    assert_eq!(err.to_string(), "Configuration error: Missing API key");
}

#[test]
fn test_profile_not_found_display() {
    let err = PalaverError::ProfileNotFound("work".to_string());
    assert_eq!(err.to_string(), "Profile not found: work");
}

#[test]
fn test_inheritance_cycle_display() {
    let err = PalaverError::InheritanceCycle(vec![
        "a".to_string(),
        "b".to_string(),
        "a".to_string(),
    ]);
    assert_eq!(err.to_string(), "Profile inheritance cycle: a -> b -> a");
}

#[test]
fn test_rate_limited_display() {
    let err = ApiError::RateLimited(30);
    assert_eq!(err.to_string(), "Rate limited: retry after 30 seconds");
}

#[test]
fn test_server_error_display() {
    let err = ApiError::ServerError {
        status: 503,
        message: "overloaded".to_string(),
    };
    assert_eq!(err.to_string(), "API error (503): overloaded");
}

#[test]
fn test_api_error_wraps() {
    let err: PalaverError = ApiError::AuthenticationFailed("bad key".to_string()).into();
    assert_eq!(err.to_string(), "API error: Authentication failed: bad key");
}

#[test]
fn test_io_error_from() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: PalaverError = io.into();
    assert!(matches!(err, PalaverError::Io(_)));
    assert_eq!(err.category(), ErrorCategory::User);
}

#[test]
fn test_unexpected_io_is_system() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
    let err: PalaverError = io.into();
    assert_eq!(err.category(), ErrorCategory::System);
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_json_error_from() {
    let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: PalaverError = parse.into();
    assert!(matches!(err, PalaverError::Json(_)));
    assert_eq!(err.category(), ErrorCategory::System);
}

#[test]
fn test_yaml_error_from() {
    let parse = serde_yaml::from_str::<serde_yaml::Value>("a: [1, 2").unwrap_err();
    let err: PalaverError = parse.into();
    assert!(matches!(err, PalaverError::Yaml(_)));
    assert_eq!(err.category(), ErrorCategory::User);
}

#[test]
fn test_categories() {
    let provider: PalaverError = ApiError::ModelNotFound("x".to_string()).into();
    assert_eq!(provider.category(), ErrorCategory::Provider);
    assert_eq!(provider.exit_code(), 1);

    let user = PalaverError::InvalidInput("empty".to_string());
    assert_eq!(user.category(), ErrorCategory::User);
    assert_eq!(user.exit_code(), 2);

    let bug = PalaverError::Internal("oops".to_string());
    assert_eq!(bug.category(), ErrorCategory::System);
    assert_eq!(bug.exit_code(), 1);
}

#[test]
fn test_tool_and_session_errors_are_user_errors() {
    assert_eq!(
        PalaverError::ToolExecution("boom".to_string()).exit_code(),
        2
    );
    assert_eq!(PalaverError::Session("bad id".to_string()).exit_code(), 2);
}

#[test]
fn test_context_overflow_detection() {
    let err: PalaverError = ApiError::ContextTooLong("too many tokens".to_string()).into();
    assert!(err.is_context_overflow());

    let other: PalaverError = ApiError::RateLimited(1).into();
    assert!(!other.is_context_overflow());
    assert!(!PalaverError::Config("x".to_string()).is_context_overflow());
}

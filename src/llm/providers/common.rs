// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Helpers shared by the HTTP provider adapters

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Response;
use serde_json::Value;

use crate::error::{ApiError, PalaverError, Result};

const DEFAULT_RETRY_AFTER_SECS: u32 = 60;

const OVERFLOW_MARKERS: [&str; 8] = [
    "context_length_exceeded",
    "maximum context length",
    "context window",
    "prompt is too long",
    "input is too long",
    "too many input tokens",
    "too many tokens",
    "reduce the length of the messages",
];

/// Pass a successful response through, or turn a failed one into an error.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after_seconds(response.headers());
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), body = %body, "Provider returned an error");
    Err(error_from_response(status.as_u16(), retry_after, &body))
}

/// Map a non-success status and body to a provider error.
pub(crate) fn error_from_response(status: u16, retry_after: Option<u64>, body: &str) -> PalaverError {
    let (message, code) = extract_error_details(body);

    let api = if code.as_deref() == Some("context_length_exceeded")
        || is_context_overflow_message(&message)
    {
        ApiError::ContextTooLong(message)
    } else {
        match status {
            401 | 403 => ApiError::AuthenticationFailed(message),
            429 => ApiError::RateLimited(
                retry_after
                    .and_then(|s| u32::try_from(s).ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            ),
            404 => ApiError::ModelNotFound(message),
            _ => ApiError::ServerError { status, message },
        }
    };

    PalaverError::Api(api)
}

/// The human-readable message from an error body.
///
/// Tries `error.message`, `message`, then `Message`; falls back to the body.
pub(crate) fn extract_error_message(body: &str) -> String {
    extract_error_details(body).0
}

fn extract_error_details(body: &str) -> (String, Option<String>) {
    let fallback = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.to_string()
        }
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return (fallback(), None);
    };

    let code = json
        .pointer("/error/code")
        .or_else(|| json.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let message = json
        .pointer("/error/message")
        .or_else(|| json.get("message"))
        .or_else(|| json.get("Message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(fallback);

    (message, code)
}

/// Whether an error message reports a context-window overflow
pub(crate) fn is_context_overflow_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    OVERFLOW_MARKERS.iter().any(|m| lower.contains(m))
}

/// Parse numeric Retry-After header (seconds).
pub(crate) fn parse_retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Drop a trailing slash so paths can be appended.
pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

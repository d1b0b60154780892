//! Provider error classification
//!
//! Backends surface failures as free-form text. This module maps that text to
//! the [`LLMError`] taxonomy by case-insensitive substring matching. The phrase
//! tables are provider specific and not guaranteed stable; a backend that
//! exposes a structured error code should build [`LLMError`] directly instead.

use std::time::Duration;

use chatbridge_core::LLMError;

const CONTEXT_OVERFLOW_PATTERNS: &[&str] = &[
    "context_length_exceeded",
    "maximum context length",
    "context length exceeded",
    "too many tokens",
    "prompt is too long",
    "exceeds the context window",
];

const AUTH_PATTERNS: &[&str] = &[
    "invalid_api_key",
    "invalid api key",
    "incorrect api key",
    "unauthorized",
    "authentication",
    "auth error",
    "permission denied",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate_limit_exceeded",
    "rate limit",
    "too many requests",
    "insufficient_quota",
    "quota",
    "resource_exhausted",
];

const PROVIDER_PATTERNS: &[&str] = &[
    "provider error",
    "http error",
    "response format error",
    "invalid request",
    "api error",
    "server_error",
    "overloaded",
    "service unavailable",
];

fn matches_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}

/// First three-digit HTTP error status mentioned in the message, if any.
fn status_code(message: &str) -> Option<u16> {
    message
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .find(|code| (400..600).contains(code))
}

/// Parses hints such as "Please try again in 20s" or "try again in 350ms".
fn retry_after(lowered: &str) -> Option<Duration> {
    let rest = &lowered[lowered.find("try again in ")? + "try again in ".len()..];
    let number: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = number.parse().ok()?;
    let unit = &rest[number.len()..];
    if unit.starts_with("ms") {
        Some(Duration::from_millis(value.round() as u64))
    } else if unit.starts_with('s') {
        Some(Duration::from_millis((value * 1000.0).round() as u64))
    } else {
        None
    }
}

/// Maps a backend error message to an [`LLMError`].
///
/// Context overflow is checked first so that a 400 carrying an overflow
/// diagnostic is not reported as a generic provider failure.
pub fn classify_provider_error(message: &str) -> LLMError {
    let lowered = message.to_lowercase();
    let status = status_code(&lowered);

    if matches_any(&lowered, CONTEXT_OVERFLOW_PATTERNS) {
        return LLMError::ContextOverflow(message.to_string());
    }

    if matches!(status, Some(401) | Some(403)) || matches_any(&lowered, AUTH_PATTERNS) {
        return LLMError::Auth(message.to_string());
    }

    if status == Some(429) || matches_any(&lowered, RATE_LIMIT_PATTERNS) {
        return LLMError::RateLimited {
            message: message.to_string(),
            retry_after: retry_after(&lowered),
        };
    }

    if status.is_some() || matches_any(&lowered, PROVIDER_PATTERNS) {
        return LLMError::Provider {
            message: message.to_string(),
            status,
        };
    }

    LLMError::Unknown(message.to_string())
}

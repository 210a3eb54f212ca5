//! LLM provider implementations
//!
//! Concrete [`CompletionBackend`](crate::CompletionBackend) implementations
//! for hosted chat APIs. Both clients share the same rate limiting shape.

pub mod anthropic;
pub mod openai;

pub use anthropic::{AnthropicChat, AnthropicClient, DEFAULT_ANTHROPIC_MODEL};
pub use openai::{OpenAIChat, OpenAIClient, DEFAULT_OPENAI_MODEL};

use reel_core::{LlmError, ReelError};
use reqwest::header::HeaderMap;

pub(crate) fn request_failed(
    provider: &str,
    status: i32,
    message: impl Into<String>,
) -> ReelError {
    ReelError::Llm(LlmError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> ReelError {
    ReelError::Llm(LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> ReelError {
    ReelError::Llm(LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}

/// Parse a `retry-after` header given in (possibly fractional) seconds.
pub(crate) fn parse_retry_after_ms(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as i64)
}

/// Minimum spacing between requests for a requests-per-minute budget.
pub(crate) fn min_interval_ms(requests_per_minute: u32) -> u64 {
    (60_000 / requests_per_minute.max(1) as u64).max(10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after_ms(&headers), Some(1500));
    }

    #[test]
    fn test_parse_retry_after_missing_or_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after_ms(&headers), None);
    }

    #[test]
    fn test_min_interval_bounds() {
        assert_eq!(min_interval_ms(60), 1000);
        assert_eq!(min_interval_ms(0), 60_000);
        assert_eq!(min_interval_ms(100_000), 10);
    }
}

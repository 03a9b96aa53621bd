//! LLM client error types.

use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Failed to parse model output: {0}")]
    Parse(String),

    #[error("All models failed: {0}")]
    AllModelsFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LlmError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn empty_response(msg: impl Into<String>) -> Self {
        Self::EmptyResponse(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        if status == 429 {
            return Self::RateLimited(message.into());
        }
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Transient provider failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Request(_) | LlmError::Timeout(_) | LlmError::RateLimited(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            // Malformed output is often fixed by sampling again
            LlmError::EmptyResponse(_) | LlmError::Parse(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            LlmError::api(status.as_u16(), e.to_string())
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::request("connection reset").is_retryable());
        assert!(LlmError::api(429, "slow down").is_retryable());
        assert!(LlmError::api(503, "unavailable").is_retryable());
        assert!(LlmError::parse("not json").is_retryable());
        assert!(!LlmError::api(401, "bad key").is_retryable());
        assert!(!LlmError::config("OPENAI_API_KEY not set").is_retryable());
    }

    #[test]
    fn test_429_maps_to_rate_limited() {
        assert!(matches!(LlmError::api(429, "x"), LlmError::RateLimited(_)));
    }
}

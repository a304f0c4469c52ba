//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors from a completion call
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),

    #[error("Unknown LLM provider '{0}' (supported: openai)")]
    UnknownProvider(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) => true,
            LlmError::ApiError { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Statuses worth retrying with backoff
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

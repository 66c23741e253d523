//! LLM collaborator errors
//!
//! Every failure of the language-model collaborator is reported as an
//! [`LlmError`], whether it happened on the wire or while decoding the
//! structured output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to an LLM provider
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum LlmError {
    /// API request failed with the given message
    #[error("API error{}: {message}", status_suffix(.status_code))]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or credentials are invalid
    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitError { retry_after: Option<u64> },

    /// The response was not the JSON document that was asked for
    #[error("Invalid JSON from LLM: {message}")]
    InvalidJson {
        message: String,
        raw_response: Option<String>,
    },

    /// Missing API keys, unknown provider and similar
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Network-related error
    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Error: {message}")]
    Other { message: String },
}

fn status_suffix(code: &Option<u16>) -> String {
    code.map(|c| format!(" ({})", c)).unwrap_or_default()
}

impl LlmError {
    pub fn invalid_json(message: impl Into<String>, raw: impl Into<String>) -> Self {
        LlmError::InvalidJson {
            message: message.into(),
            raw_response: Some(raw.into()),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        LlmError::Other {
            message: message.into(),
        }
    }
}

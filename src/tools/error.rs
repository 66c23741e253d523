//! Tool failures
//!
//! A [`ToolError`] is either transient (worth another attempt after a
//! backoff) or permanent (retrying cannot help). The executor only looks at
//! [`ToolError::is_transient`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientKind {
    Timeout,
    RateLimited,
    Network,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermanentKind {
    InvalidParameters,
    Authentication,
    NotFound,
    UnknownTool,
    Unsupported,
    InvalidResponse,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransientKind::Timeout => "timeout",
            TransientKind::RateLimited => "rate limited",
            TransientKind::Network => "network",
            TransientKind::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

impl fmt::Display for PermanentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermanentKind::InvalidParameters => "invalid parameters",
            PermanentKind::Authentication => "authentication",
            PermanentKind::NotFound => "not found",
            PermanentKind::UnknownTool => "unknown tool",
            PermanentKind::Unsupported => "unsupported",
            PermanentKind::InvalidResponse => "invalid response",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ToolError {
    #[error("{kind}: {message}")]
    Transient {
        kind: TransientKind,
        message: String,
    },

    #[error("{kind}: {message}")]
    Permanent {
        kind: PermanentKind,
        message: String,
    },
}

impl ToolError {
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        ToolError::Transient {
            kind,
            message: message.into(),
        }
    }

    pub fn permanent(kind: PermanentKind, message: impl Into<String>) -> Self {
        ToolError::Permanent {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::transient(TransientKind::Timeout, message)
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::permanent(PermanentKind::InvalidParameters, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::permanent(PermanentKind::Authentication, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::permanent(PermanentKind::InvalidResponse, message)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ToolError::Transient { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ToolError::Transient { message, .. } | ToolError::Permanent { message, .. } => message,
        }
    }
}

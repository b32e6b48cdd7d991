//! Error types for the chatbot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors raised by the service layer (LLM, search, configuration).
#[derive(Error, Debug)]
pub enum RagError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP transport error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service asked us to slow down (HTTP 429).
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The model refused the prompt or its output under a content policy.
    #[error("Content rejected: {0}")]
    ContentRejected(String),

    /// Search API error.
    #[error("Search API error: {0}")]
    Search(String),

    /// A hosted service answered with a 5xx status.
    #[error("Upstream service error ({status}): {message}")]
    Upstream { status: u16, message: String },
}

impl RagError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a client may retry the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::RateLimited(_) | RagError::Http(_) | RagError::Upstream { .. }
        )
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::LlmParse(err.to_string())
    }
}

/// Machine-readable kind of a chat failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatErrorKind {
    InvalidRequest,
    ServiceUnavailable,
}

impl std::fmt::Display for ChatErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatErrorKind::InvalidRequest => write!(f, "invalid_request"),
            ChatErrorKind::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

/// Errors surfaced by the chat handler to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The request was malformed; no external service was called.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The retriever or generator failed.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ChatError {
    pub fn kind(&self) -> ChatErrorKind {
        match self {
            ChatError::InvalidRequest(_) => ChatErrorKind::InvalidRequest,
            ChatError::ServiceUnavailable(_) => ChatErrorKind::ServiceUnavailable,
        }
    }

    /// The human-readable reason without the kind prefix.
    pub fn reason(&self) -> &str {
        match self {
            ChatError::InvalidRequest(msg) | ChatError::ServiceUnavailable(msg) => msg,
        }
    }
}

impl From<RagError> for ChatError {
    fn from(err: RagError) -> Self {
        ChatError::ServiceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(RagError::RateLimited("slow down".into()).is_retryable());
        assert!(RagError::Http("connection reset".into()).is_retryable());
        assert!(
            RagError::Upstream {
                status: 503,
                message: "busy".into()
            }
            .is_retryable()
        );
        assert!(!RagError::LlmApi("API error (401 Unauthorized): bad key".into()).is_retryable());
        assert!(!RagError::ContentRejected("filtered".into()).is_retryable());
        assert!(!RagError::LlmParse("bad json".into()).is_retryable());
    }

    #[test]
    fn test_rag_error_collapses_to_service_unavailable() {
        let err: ChatError = RagError::ContentRejected("filtered".into()).into();
        assert_eq!(err.kind(), ChatErrorKind::ServiceUnavailable);
        assert!(err.reason().contains("filtered"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ChatErrorKind::InvalidRequest).unwrap();
        assert_eq!(json, "\"invalid_request\"");
        assert_eq!(ChatErrorKind::ServiceUnavailable.to_string(), "service_unavailable");
    }
}

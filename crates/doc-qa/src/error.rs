//! Error types for the question answering service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for doc-qa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by a model gateway once its own retries are exhausted
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Provider answered 429
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Request did not complete in time
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection, DNS or body transfer failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered 5xx
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Provider rejected the credentials or the request (4xx other than 429)
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl GatewayError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited(_)
                | GatewayError::Timeout(_)
                | GatewayError::Transport(_)
                | GatewayError::Server { .. }
        )
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::from_status(status.as_u16(), err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => GatewayError::RateLimited(message),
            408 | 504 => GatewayError::Timeout(message),
            500..=599 => GatewayError::Server { status, message },
            _ => GatewayError::Rejected { status, message },
        }
    }
}

/// doc-qa errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request body failed validation
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Document could not be fetched or read
    #[error("Failed to extract text from '{source_ref}': {message}")]
    Extraction { source_ref: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Model gateway failure after retries
    #[error("LLM gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error
    pub fn extraction(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            source_ref: source_ref.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the request's own input caused this error (bad body, unreadable
    /// document) rather than the service
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Extraction { .. } | Error::UnsupportedFileType(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            Error::Extraction { source_ref, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "extraction_error",
                format!("Failed to extract text from '{}': {}", source_ref, message),
            ),
            Error::UnsupportedFileType(ext) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::Gateway(err) => (StatusCode::BAD_GATEWAY, "llm_error", err.to_string()),
            Error::Embedding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error", msg.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (
                StatusCode::BAD_GATEWAY,
                "http_error",
                err.to_string(),
            ),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(GatewayError::from_status(429, "slow down"), GatewayError::RateLimited(_)));
        assert!(matches!(GatewayError::from_status(504, "gw"), GatewayError::Timeout(_)));
        assert!(matches!(
            GatewayError::from_status(503, "down"),
            GatewayError::Server { status: 503, .. }
        ));
        assert!(matches!(
            GatewayError::from_status(401, "bad key"),
            GatewayError::Rejected { status: 401, .. }
        ));
    }

    #[test]
    fn test_transient_errors() {
        assert!(GatewayError::Timeout("t".into()).is_transient());
        assert!(GatewayError::Transport("t".into()).is_transient());
        assert!(!GatewayError::from_status(400, "bad").is_transient());
    }

    #[test]
    fn test_request_fatal() {
        assert!(Error::validation("questions must be an array").is_request_fatal());
        assert!(Error::extraction("doc.pdf", "empty").is_request_fatal());
        assert!(!Error::Gateway(GatewayError::Timeout("t".into())).is_request_fatal());
        assert!(!Error::internal("parser task panicked").is_request_fatal());
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = Error::validation("missing documents").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

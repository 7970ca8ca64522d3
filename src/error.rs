//! Error types for the ingestion pipeline and inference relay

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vector index unreachable after the startup retry budget
    #[error("Vector index unavailable after {attempts} attempts: {message}")]
    IndexUnavailable { attempts: u32, message: String },

    /// Dataset or uploaded file cannot be opened
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A single record failed embedding or insertion
    #[error("Record {id} rejected: {message}")]
    RecordRejected { id: u64, message: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error (per-call, after startup)
    #[error("Vector index error: {0}")]
    Index(String),

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
    /// Create a source-unavailable error
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::IndexUnavailable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "index_unavailable",
                self.to_string(),
            ),
            Error::SourceUnavailable(msg) => (
                StatusCode::BAD_REQUEST,
                "source_unavailable",
                msg.clone(),
            ),
            Error::RecordRejected { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "record_rejected",
                self.to_string(),
            ),
            Error::Embedding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error", msg.clone())
            }
            Error::Index(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "index_error", msg.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
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
    fn test_record_rejected_names_the_record() {
        let err = Error::RecordRejected {
            id: 7,
            message: "HTTP 422 Unprocessable Entity".to_string(),
        };
        assert_eq!(err.to_string(), "Record 7 rejected: HTTP 422 Unprocessable Entity");
    }

    #[test]
    fn test_source_unavailable_maps_to_bad_request() {
        let response = Error::source_unavailable("no such dataset").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

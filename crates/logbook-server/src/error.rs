//! Error types for the logbook server.

use std::net::SocketAddr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use logbook_core::LogbookError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(std::io::Error),

    /// The request could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The logbook service rejected or failed the operation.
    #[error(transparent)]
    Logbook(#[from] LogbookError),
}

impl ApiError {
    /// HTTP status and machine readable error type for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Logbook(LogbookError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Logbook(err) if err.is_retryable() => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
            Self::Logbook(LogbookError::MalformedQuery(_)) => {
                (StatusCode::BAD_REQUEST, "malformed_query")
            }
            Self::Logbook(err) if err.is_client_error() => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            Self::Logbook(_) | Self::BindFailed(_, _) | Self::Serve(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

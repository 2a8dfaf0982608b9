//! Error types for the correlation middleware.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Failures while resolving the correlation id of a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The header was absent and generation is disabled.
    #[error("Correlation ID required")]
    Missing,

    /// The header was present but not a usable correlation id.
    #[error("Invalid correlation ID: {0}")]
    InvalidFormat(String),
}

impl CorrelationError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            CorrelationError::Missing => "missing_correlation_id",
            CorrelationError::InvalidFormat(_) => "invalid_correlation_id",
        }
    }
}

/// JSON body returned for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<&CorrelationError> for ErrorResponse {
    fn from(err: &CorrelationError) -> Self {
        Self {
            error: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for CorrelationError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        (
            self.status_code(),
            [("content-type", "application/json")],
            serde_json::to_string(&body).unwrap_or_else(|_| {
                r#"{"error":"internal_error","message":"Failed to serialize error"}"#.to_string()
            }),
        )
            .into_response()
    }
}

//! Audit API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pipeaudit_core::AuditError;
use pipeaudit_reconciliation::{EventStoreError, ReconciliationError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error type for audit API operations.
#[derive(Debug, Error)]
pub enum AuditApiError {
    /// Request body failed field-level validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Domain validation or an unknown enumeration value.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// The event store could not be reached.
    #[error("event store error: {0}")]
    Store(#[from] EventStoreError),
}

impl From<ReconciliationError> for AuditApiError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::Validation(e) => Self::Audit(e),
            ReconciliationError::Store(e) => Self::Store(e),
        }
    }
}

impl From<validator::ValidationErrors> for AuditApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for AuditApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AuditApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "validation_error", self.to_string())
            }
            AuditApiError::Audit(AuditError::ValidationError { .. }) => {
                (StatusCode::BAD_REQUEST, "validation_error", self.to_string())
            }
            AuditApiError::Audit(AuditError::UnknownValue { .. }) => {
                (StatusCode::BAD_REQUEST, "unknown_value", self.to_string())
            }
            AuditApiError::Store(ref e) => {
                error!(error = %e, "Event store error occurred");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "Event store unavailable".to_string(),
                )
            }
        };

        let body = json!({
            "error": error_type,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for audit API operations.
pub type ApiResult<T> = std::result::Result<T, AuditApiError>;

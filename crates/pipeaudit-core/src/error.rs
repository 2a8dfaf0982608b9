//! Error Types
//!
//! Input-level errors shared by every pipeaudit crate.
//!
//! # Example
//!
//! ```
//! use pipeaudit_core::{AuditError, Result};
//!
//! fn require_source(source: &str) -> Result<&str> {
//!     if source.trim().is_empty() {
//!         return Err(AuditError::validation("source_system", "must not be blank"));
//!     }
//!     Ok(source)
//! }
//!
//! assert!(require_source(" ").is_err());
//! ```

use serde::Serialize;
use thiserror::Error;

/// Standardized error type for pipeaudit input handling.
///
/// - `ValidationError` - a field failed validation (HTTP 400)
/// - `UnknownValue` - a string did not name a known enumeration member (HTTP 400)
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditError {
    /// Input validation failure.
    #[error("Validation error on field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// A textual value did not match any known variant.
    #[error("Unknown {kind} '{value}'")]
    UnknownValue {
        /// What was being parsed (e.g. "checkpoint stage")
        kind: String,
        /// The rejected input
        value: String,
    },
}

impl AuditError {
    /// Shorthand for [`AuditError::ValidationError`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for [`AuditError::UnknownValue`].
    pub fn unknown(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Returns true for [`AuditError::ValidationError`].
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }
}

/// Type alias for Results using `AuditError`.
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = AuditError::validation("status", "is required");
        assert_eq!(
            err.to_string(),
            "Validation error on field 'status': is required"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_value_display() {
        let err = AuditError::unknown("checkpoint stage", "TRANSFORM");
        assert_eq!(err.to_string(), "Unknown checkpoint stage 'TRANSFORM'");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let err = AuditError::validation("source_system", "must not be blank");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "validation_error");
        assert_eq!(json["field"], "source_system");
    }
}

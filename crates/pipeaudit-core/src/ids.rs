//! Strongly Typed Identifiers
//!
//! Audit events are keyed by a UUID [`EventId`]. Runs are keyed by a
//! [`CorrelationId`], an opaque string that producers choose (or generate)
//! and that every event in the run shares.
//!
//! # Example
//!
//! ```
//! use pipeaudit_core::{CorrelationId, EventId};
//!
//! let event = EventId::new();
//! let run: CorrelationId = "  nightly-2024-06-01  ".parse().unwrap();
//!
//! assert_eq!(run.as_str(), "nightly-2024-06-01");
//! assert_eq!(event.to_string().len(), 36);
//! ```

use crate::error::AuditError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Longest correlation id accepted after trimming.
pub const MAX_CORRELATION_ID_LEN: usize = 128;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying UUID parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed UUID identifier
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Identifier of a single stored audit event.
    ///
    /// Assigned by the event store on insert.
    EventId
);

/// Identifier shared by every audit event of one pipeline run.
///
/// Always trimmed and non-empty. Ordering is plain string ordering, which
/// is what multi-run detection uses to keep its output stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a fresh correlation id (a UUID v4 in hyphenated form).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parses and normalizes a caller-supplied correlation id.
    ///
    /// Surrounding whitespace is removed. Blank values, values longer than
    /// [`MAX_CORRELATION_ID_LEN`] and values containing control characters
    /// are rejected.
    pub fn parse(value: impl AsRef<str>) -> crate::Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AuditError::validation("correlation_id", "must not be blank"));
        }
        if trimmed.len() > MAX_CORRELATION_ID_LEN {
            return Err(AuditError::validation(
                "correlation_id",
                format!("must be at most {MAX_CORRELATION_ID_LEN} characters"),
            ));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(AuditError::validation(
                "correlation_id",
                "must not contain control characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CorrelationId {
    type Err = AuditError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = AuditError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

//! pipeaudit Core Library
//!
//! Shared types for the pipeline audit workspace.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (EventId, CorrelationId)
//! - [`error`] - Standardized error types (AuditError)
//! - [`correlation`] - Ambient correlation context for the current thread or task
//!
//! # Example
//!
//! ```
//! use pipeaudit_core::{correlation, CorrelationId};
//!
//! let id = CorrelationId::generate();
//! let _guard = correlation::enter(id.clone());
//! assert_eq!(correlation::current(), Some(id));
//! ```

pub mod correlation;
pub mod error;
pub mod ids;

pub use correlation::CorrelationGuard;
pub use error::{AuditError, Result};
pub use ids::{CorrelationId, EventId, ParseIdError, MAX_CORRELATION_ID_LEN};

//! pipeaudit Database Layer
//!
//! PostgreSQL storage for pipeline checkpoint events.
//!
//! - [`models`] - The `pipeline_audit_events` row model and its queries
//! - [`error`] - [`DbError`]
//! - [`migrations`] - Embedded schema migrations

pub mod error;
pub mod migrations;
pub mod models;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::{AuditEvent, CheckpointStage, EventFilter, EventStatus, NewAuditEvent};

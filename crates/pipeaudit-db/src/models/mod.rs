//! Database models.

pub mod audit_event;

pub use audit_event::{AuditEvent, CheckpointStage, EventFilter, EventStatus, NewAuditEvent};

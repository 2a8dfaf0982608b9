//! # pipeaudit-api
//!
//! HTTP surface of the pipeline audit service: checkpoint ingestion, run
//! timelines, reconciliation reports in three projections and ad hoc
//! discrepancy detection. Every route runs behind the correlation
//! middleware, so a logged event without a `correlation_id` picks up the
//! request's `X-Correlation-ID`.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;

pub use error::{ApiResult, AuditApiError};
pub use router::{audit_routes, audit_routes_with_correlation, AuditApiState};

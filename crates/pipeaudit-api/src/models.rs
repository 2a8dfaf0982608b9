//! Request and response models for the audit API.

use chrono::{DateTime, Utc};
use pipeaudit_core::CorrelationId;
use pipeaudit_db::{AuditEvent, CheckpointStage, EventStatus};
use pipeaudit_reconciliation::{
    Discrepancy, DiscrepancyFilter, LogAuditEvent, ReportFormat, Severity, StatusCounts,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

/// Request to log one checkpoint event.
///
/// Stage and status are accepted as text and parsed leniently
/// (`load-complete`, `Load_Complete` and `LOAD_COMPLETE` are the same stage).
/// `correlation_id` may be omitted when the request carries
/// `X-Correlation-ID`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LogEventRequest {
    #[validate(length(max = 128, message = "Correlation ID cannot exceed 128 characters"))]
    pub correlation_id: Option<String>,

    #[validate(length(max = 255, message = "Source system cannot exceed 255 characters"))]
    pub source_system: Option<String>,

    #[validate(length(max = 255, message = "Module name cannot exceed 255 characters"))]
    pub module_name: Option<String>,

    #[validate(length(max = 255, message = "Process name cannot exceed 255 characters"))]
    pub process_name: Option<String>,

    #[validate(length(max = 255, message = "Source entity cannot exceed 255 characters"))]
    pub source_entity: Option<String>,

    #[validate(length(max = 255, message = "Destination entity cannot exceed 255 characters"))]
    pub destination_entity: Option<String>,

    #[validate(length(max = 255, message = "Key identifier cannot exceed 255 characters"))]
    pub key_identifier: Option<String>,

    pub checkpoint_stage: Option<String>,

    pub status: Option<String>,

    pub event_timestamp: Option<DateTime<Utc>>,

    #[validate(length(max = 4000, message = "Message cannot exceed 4000 characters"))]
    pub message: Option<String>,

    pub metadata: Option<JsonValue>,
}

impl LogEventRequest {
    /// Parses stage and status. Presence checks are left to
    /// [`LogAuditEvent::validate`].
    pub fn into_log_event(self) -> pipeaudit_core::Result<LogAuditEvent> {
        let checkpoint_stage = self
            .checkpoint_stage
            .as_deref()
            .map(str::parse::<CheckpointStage>)
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<EventStatus>)
            .transpose()?;

        Ok(LogAuditEvent {
            correlation_id: self.correlation_id,
            source_system: self.source_system,
            module_name: self.module_name,
            process_name: self.process_name,
            source_entity: self.source_entity,
            destination_entity: self.destination_entity,
            key_identifier: self.key_identifier,
            checkpoint_stage,
            status,
            event_timestamp: self.event_timestamp,
            message: self.message,
            metadata: self.metadata,
        })
    }
}

/// Ordered events of one run.
#[derive(Debug, Serialize)]
pub struct RunEventsResponse {
    pub correlation_id: CorrelationId,
    pub events: Vec<AuditEvent>,
    pub total: usize,
}

/// Query parameters for report retrieval.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

impl ReportQuery {
    pub fn format(&self) -> pipeaudit_core::Result<ReportFormat> {
        self.format
            .as_deref()
            .map_or(Ok(ReportFormat::default()), str::parse)
    }
}

/// Per-status event counts of one run.
#[derive(Debug, Serialize)]
pub struct StatusCountsResponse {
    pub correlation_id: CorrelationId,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub total: i64,
}

impl StatusCountsResponse {
    pub fn new(correlation_id: CorrelationId, counts: StatusCounts) -> Self {
        Self {
            correlation_id,
            total: counts.success + counts.failure + counts.warning,
            counts,
        }
    }
}

/// Query parameters for ad hoc discrepancy detection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscrepancyQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub source_system: Option<String>,
    pub module_name: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
}

impl DiscrepancyQuery {
    /// Converts to the engine filter, parsing status and severity names.
    pub fn into_filter(self) -> pipeaudit_core::Result<DiscrepancyFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<EventStatus>)
            .transpose()?;
        let severity = self
            .severity
            .as_deref()
            .map(str::parse::<Severity>)
            .transpose()?;

        Ok(DiscrepancyFilter {
            start: self.start,
            end: self.end,
            source_system: self.source_system.filter(|s| !s.trim().is_empty()),
            module_name: self.module_name.filter(|m| !m.trim().is_empty()),
            status,
            severity,
        })
    }
}

/// Response for ad hoc discrepancy detection.
#[derive(Debug, Serialize)]
pub struct ListDiscrepanciesResponse {
    pub discrepancies: Vec<Discrepancy>,
    pub total: usize,
}

//! Pipeline audit event model.
//!
//! One row per checkpoint observation. Rows are immutable once inserted:
//! this module exposes INSERT and read queries only.

use chrono::{DateTime, Utc};
use pipeaudit_core::{AuditError, CorrelationId, EventId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The five checkpoints of a batch pipeline run, in pipeline order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointStage {
    /// Mainframe file landed.
    Landing,
    /// Bulk load started.
    LoadStart,
    /// Bulk load finished.
    LoadComplete,
    /// Business rules applied.
    RulesApplied,
    /// Output file generated.
    OutputGenerated,
}

impl CheckpointStage {
    /// Every stage a complete run reports, in pipeline order.
    pub const ALL: [CheckpointStage; 5] = [
        Self::Landing,
        Self::LoadStart,
        Self::LoadComplete,
        Self::RulesApplied,
        Self::OutputGenerated,
    ];

    /// Canonical upper-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landing => "LANDING",
            Self::LoadStart => "LOAD_START",
            Self::LoadComplete => "LOAD_COMPLETE",
            Self::RulesApplied => "RULES_APPLIED",
            Self::OutputGenerated => "OUTPUT_GENERATED",
        }
    }
}

impl fmt::Display for CheckpointStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckpointStage {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| AuditError::unknown("checkpoint stage", s))
    }
}

/// Outcome reported by a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Success,
    Failure,
    Warning,
}

impl EventStatus {
    /// Canonical upper-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            "WARNING" => Ok(Self::Warning),
            _ => Err(AuditError::unknown("event status", s)),
        }
    }
}

/// A stored checkpoint event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditEvent {
    #[sqlx(try_from = "Uuid")]
    pub id: EventId,
    #[sqlx(try_from = "String")]
    pub correlation_id: CorrelationId,
    pub source_system: String,
    pub module_name: Option<String>,
    pub process_name: Option<String>,
    pub source_entity: Option<String>,
    pub destination_entity: Option<String>,
    pub key_identifier: Option<String>,
    pub checkpoint_stage: CheckpointStage,
    pub status: EventStatus,
    pub event_timestamp: DateTime<Utc>,
    pub message: Option<String>,
    /// Raw metadata payload, decoded on read by the reconciliation codec.
    pub metadata: Option<JsonValue>,
    /// Storage (arrival) time.
    pub created_at: DateTime<Utc>,
}

/// A validated event ready to be appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEvent {
    pub correlation_id: CorrelationId,
    pub source_system: String,
    pub module_name: Option<String>,
    pub process_name: Option<String>,
    pub source_entity: Option<String>,
    pub destination_entity: Option<String>,
    pub key_identifier: Option<String>,
    pub checkpoint_stage: CheckpointStage,
    pub status: EventStatus,
    pub event_timestamp: DateTime<Utc>,
    pub message: Option<String>,
    pub metadata: Option<JsonValue>,
}

impl NewAuditEvent {
    /// Materializes the stored form with an assigned id and arrival time.
    #[must_use]
    pub fn into_event(self, id: EventId, created_at: DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            id,
            correlation_id: self.correlation_id,
            source_system: self.source_system,
            module_name: self.module_name,
            process_name: self.process_name,
            source_entity: self.source_entity,
            destination_entity: self.destination_entity,
            key_identifier: self.key_identifier,
            checkpoint_stage: self.checkpoint_stage,
            status: self.status,
            event_timestamp: self.event_timestamp,
            message: self.message,
            metadata: self.metadata,
            created_at,
        }
    }
}

/// Optional equality filters for time-range queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub source_system: Option<String>,
    pub module_name: Option<String>,
    pub status: Option<EventStatus>,
}

impl EventFilter {
    /// Returns true when `event` satisfies every filter that is set.
    #[must_use]
    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.source_system
            .as_deref()
            .is_none_or(|s| event.source_system == s)
            && self
                .module_name
                .as_deref()
                .is_none_or(|m| event.module_name.as_deref() == Some(m))
            && self.status.is_none_or(|s| event.status == s)
    }
}

const SELECT_COLUMNS: &str = r"
    SELECT id, correlation_id, source_system, module_name, process_name,
           source_entity, destination_entity, key_identifier, checkpoint_stage,
           status, event_timestamp, message, metadata, created_at
    FROM pipeline_audit_events
";

impl AuditEvent {
    /// Append a new event (INSERT only - events are immutable).
    pub async fn insert(pool: &PgPool, input: &NewAuditEvent) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r"
            INSERT INTO pipeline_audit_events (
                id, correlation_id, source_system, module_name, process_name,
                source_entity, destination_entity, key_identifier, checkpoint_stage,
                status, event_timestamp, message, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, correlation_id, source_system, module_name, process_name,
                      source_entity, destination_entity, key_identifier, checkpoint_stage,
                      status, event_timestamp, message, metadata, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(input.correlation_id.as_str())
        .bind(&input.source_system)
        .bind(&input.module_name)
        .bind(&input.process_name)
        .bind(&input.source_entity)
        .bind(&input.destination_entity)
        .bind(&input.key_identifier)
        .bind(input.checkpoint_stage)
        .bind(input.status)
        .bind(input.event_timestamp)
        .bind(&input.message)
        .bind(&input.metadata)
        .fetch_one(pool)
        .await
    }

    /// All events of one run, in arrival order.
    pub async fn find_by_correlation_id(
        pool: &PgPool,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("{SELECT_COLUMNS} WHERE correlation_id = $1 ORDER BY created_at, id");
        sqlx::query_as::<_, Self>(&query)
            .bind(correlation_id.as_str())
            .fetch_all(pool)
            .await
    }

    /// Events whose `event_timestamp` lies within `[start, end]` (either bound
    /// optional) and that match `filter`, in arrival order.
    pub async fn find_by_time_range(
        pool: &PgPool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        filter: &EventFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("{SELECT_COLUMNS} WHERE TRUE");

        let mut param_idx = 1;
        let mut conditions = Vec::new();

        if start.is_some() {
            conditions.push(format!("event_timestamp >= ${param_idx}"));
            param_idx += 1;
        }
        if end.is_some() {
            conditions.push(format!("event_timestamp <= ${param_idx}"));
            param_idx += 1;
        }
        if filter.source_system.is_some() {
            conditions.push(format!("source_system = ${param_idx}"));
            param_idx += 1;
        }
        if filter.module_name.is_some() {
            conditions.push(format!("module_name = ${param_idx}"));
            param_idx += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
        }

        for condition in conditions {
            query.push_str(" AND ");
            query.push_str(&condition);
        }
        query.push_str(" ORDER BY created_at, id");

        let mut query_builder = sqlx::query_as::<_, Self>(&query);

        if let Some(start) = start {
            query_builder = query_builder.bind(start);
        }
        if let Some(end) = end {
            query_builder = query_builder.bind(end);
        }
        if let Some(ref source_system) = filter.source_system {
            query_builder = query_builder.bind(source_system);
        }
        if let Some(ref module_name) = filter.module_name {
            query_builder = query_builder.bind(module_name);
        }
        if let Some(status) = filter.status {
            query_builder = query_builder.bind(status);
        }

        query_builder.fetch_all(pool).await
    }

    /// Number of events of one run that reported `status`.
    pub async fn count_by_correlation_id_and_status(
        pool: &PgPool,
        correlation_id: &CorrelationId,
        status: EventStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM pipeline_audit_events
            WHERE correlation_id = $1 AND status = $2
            ",
        )
        .bind(correlation_id.as_str())
        .bind(status)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(source: &str, module: Option<&str>, status: EventStatus) -> AuditEvent {
        NewAuditEvent {
            correlation_id: CorrelationId::parse("run-1").unwrap(),
            source_system: source.to_string(),
            module_name: module.map(str::to_string),
            process_name: None,
            source_entity: None,
            destination_entity: None,
            key_identifier: None,
            checkpoint_stage: CheckpointStage::Landing,
            status,
            event_timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap(),
            message: None,
            metadata: None,
        }
        .into_event(EventId::new(), Utc::now())
    }

    mod stage_tests {
        use super::*;

        #[test]
        fn test_all_is_in_pipeline_order() {
            let mut sorted = CheckpointStage::ALL;
            sorted.sort();
            assert_eq!(sorted, CheckpointStage::ALL);
            assert_eq!(CheckpointStage::ALL[0], CheckpointStage::Landing);
            assert_eq!(CheckpointStage::ALL[4], CheckpointStage::OutputGenerated);
        }

        #[test]
        fn test_parse_is_lenient_on_case_and_dashes() {
            assert_eq!(
                "load-complete".parse::<CheckpointStage>().unwrap(),
                CheckpointStage::LoadComplete
            );
            assert_eq!(
                "RULES_APPLIED".parse::<CheckpointStage>().unwrap(),
                CheckpointStage::RulesApplied
            );
            assert!("TRANSFORM".parse::<CheckpointStage>().is_err());
        }

        #[test]
        fn test_serde_uses_screaming_snake_case() {
            let json = serde_json::to_string(&CheckpointStage::OutputGenerated).unwrap();
            assert_eq!(json, "\"OUTPUT_GENERATED\"");
            let stage: CheckpointStage = serde_json::from_str("\"LOAD_START\"").unwrap();
            assert_eq!(stage, CheckpointStage::LoadStart);
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_display_and_parse() {
            assert_eq!(EventStatus::Warning.to_string(), "WARNING");
            assert_eq!("failure".parse::<EventStatus>().unwrap(), EventStatus::Failure);
            let err = "DONE".parse::<EventStatus>().unwrap_err();
            assert_eq!(err.to_string(), "Unknown event status 'DONE'");
        }
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn test_empty_filter_matches_everything() {
            let filter = EventFilter::default();
            assert!(filter.matches(&event("MAINFRAME", None, EventStatus::Success)));
        }

        #[test]
        fn test_filters_are_conjunctive() {
            let filter = EventFilter {
                source_system: Some("MAINFRAME".to_string()),
                module_name: Some("GL".to_string()),
                status: Some(EventStatus::Failure),
            };
            assert!(filter.matches(&event("MAINFRAME", Some("GL"), EventStatus::Failure)));
            assert!(!filter.matches(&event("MAINFRAME", Some("GL"), EventStatus::Success)));
            assert!(!filter.matches(&event("MAINFRAME", None, EventStatus::Failure)));
            assert!(!filter.matches(&event("SAP", Some("GL"), EventStatus::Failure)));
        }
    }
}

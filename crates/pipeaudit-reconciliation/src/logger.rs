//! Checkpoint event logging.
//!
//! Pipeline stages describe a checkpoint with [`LogAuditEvent`] and hand it
//! to [`AuditLogger::log`]. The correlation id may be left out when one is
//! bound in the current correlation context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pipeaudit_core::{correlation, AuditError, CorrelationId};
use pipeaudit_db::{AuditEvent, CheckpointStage, EventStatus, NewAuditEvent};
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use crate::engine::ReconciliationResult;
use crate::store::EventStore;

/// Unvalidated description of one checkpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogAuditEvent {
    pub correlation_id: Option<String>,
    pub source_system: Option<String>,
    pub module_name: Option<String>,
    pub process_name: Option<String>,
    pub source_entity: Option<String>,
    pub destination_entity: Option<String>,
    pub key_identifier: Option<String>,
    pub checkpoint_stage: Option<CheckpointStage>,
    pub status: Option<EventStatus>,
    pub event_timestamp: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub metadata: Option<JsonValue>,
}

impl LogAuditEvent {
    pub fn new(
        source_system: impl Into<String>,
        checkpoint_stage: CheckpointStage,
        status: EventStatus,
    ) -> Self {
        Self {
            source_system: Some(source_system.into()),
            checkpoint_stage: Some(checkpoint_stage),
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    #[must_use]
    pub fn process_name(mut self, process_name: impl Into<String>) -> Self {
        self.process_name = Some(process_name.into());
        self
    }

    #[must_use]
    pub fn entities(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.source_entity = Some(source.into());
        self.destination_entity = Some(destination.into());
        self
    }

    #[must_use]
    pub fn key_identifier(mut self, key: impl Into<String>) -> Self {
        self.key_identifier = Some(key.into());
        self
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.event_timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Checks required fields and resolves defaults.
    ///
    /// A missing correlation id is taken from [`correlation::current`]; a
    /// missing timestamp becomes now. Optional text fields are trimmed and
    /// blank ones dropped.
    pub fn validate(self) -> pipeaudit_core::Result<NewAuditEvent> {
        let correlation_id = match non_blank(self.correlation_id) {
            Some(id) => CorrelationId::parse(id)?,
            None => correlation::current().ok_or_else(|| {
                AuditError::validation(
                    "correlation_id",
                    "is required when no correlation id is bound to the current context",
                )
            })?,
        };
        let source_system = non_blank(self.source_system)
            .ok_or_else(|| AuditError::validation("source_system", "is required"))?;
        let checkpoint_stage = self
            .checkpoint_stage
            .ok_or_else(|| AuditError::validation("checkpoint_stage", "is required"))?;
        let status = self
            .status
            .ok_or_else(|| AuditError::validation("status", "is required"))?;

        Ok(NewAuditEvent {
            correlation_id,
            source_system,
            module_name: non_blank(self.module_name),
            process_name: non_blank(self.process_name),
            source_entity: non_blank(self.source_entity),
            destination_entity: non_blank(self.destination_entity),
            key_identifier: non_blank(self.key_identifier),
            checkpoint_stage,
            status,
            event_timestamp: self.event_timestamp.unwrap_or_else(Utc::now),
            message: non_blank(self.message),
            metadata: self.metadata.filter(|m| !m.is_null()),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Appends validated checkpoint events to an [`EventStore`].
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn EventStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Validates `input` and appends it. Validation failures never reach the
    /// store.
    #[instrument(skip(self, input))]
    pub async fn log(&self, input: LogAuditEvent) -> ReconciliationResult<AuditEvent> {
        let event = self.store.insert(input.validate()?).await?;

        info!(
            event_id = %event.id,
            correlation_id = %event.correlation_id,
            source_system = %event.source_system,
            stage = %event.checkpoint_stage,
            status = %event.status,
            "Checkpoint event logged"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReconciliationError;
    use crate::store::InMemoryEventStore;

    fn store() -> Arc<InMemoryEventStore> {
        Arc::new(InMemoryEventStore::new())
    }

    #[test]
    fn test_validate_requires_source_system() {
        let err = LogAuditEvent {
            correlation_id: Some("run-1".to_string()),
            source_system: Some("   ".to_string()),
            checkpoint_stage: Some(CheckpointStage::Landing),
            status: Some(EventStatus::Success),
            ..LogAuditEvent::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, AuditError::validation("source_system", "is required"));
    }

    #[test]
    fn test_validate_requires_status_and_stage() {
        let base = LogAuditEvent {
            correlation_id: Some("run-1".to_string()),
            source_system: Some("MF".to_string()),
            ..LogAuditEvent::default()
        };

        let err = LogAuditEvent {
            checkpoint_stage: Some(CheckpointStage::Landing),
            ..base.clone()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, AuditError::ValidationError { ref field, .. } if field == "status"));

        let err = LogAuditEvent {
            status: Some(EventStatus::Success),
            ..base
        }
        .validate()
        .unwrap_err();
        assert!(
            matches!(err, AuditError::ValidationError { ref field, .. } if field == "checkpoint_stage")
        );
    }

    #[test]
    fn test_validate_requires_some_correlation_id() {
        correlation::clear();
        let err = LogAuditEvent::new("MF", CheckpointStage::Landing, EventStatus::Success)
            .validate()
            .unwrap_err();
        assert!(matches!(err, AuditError::ValidationError { ref field, .. } if field == "correlation_id"));
    }

    #[test]
    fn test_validate_uses_bound_correlation_id() {
        let bound = CorrelationId::parse("bound-run").unwrap();
        let _guard = correlation::enter(bound.clone());

        let event = LogAuditEvent::new("MF", CheckpointStage::Landing, EventStatus::Success)
            .validate()
            .unwrap();
        assert_eq!(event.correlation_id, bound);

        let explicit = LogAuditEvent::new("MF", CheckpointStage::Landing, EventStatus::Success)
            .correlation_id(" explicit ")
            .validate()
            .unwrap();
        assert_eq!(explicit.correlation_id.as_str(), "explicit");
    }

    #[test]
    fn test_validate_trims_optional_fields() {
        let event = LogAuditEvent::new(" MF ", CheckpointStage::Landing, EventStatus::Success)
            .correlation_id("run-1")
            .module_name("  ")
            .message(" landed ")
            .validate()
            .unwrap();
        assert_eq!(event.source_system, "MF");
        assert_eq!(event.module_name, None);
        assert_eq!(event.message.as_deref(), Some("landed"));
    }

    #[tokio::test]
    async fn test_log_appends_through_store() {
        let store = store();
        let logger = AuditLogger::new(store.clone());

        let event = logger
            .log(
                LogAuditEvent::new("MF", CheckpointStage::Landing, EventStatus::Success)
                    .correlation_id("run-1"),
            )
            .await
            .unwrap();

        assert_eq!(event.correlation_id.as_str(), "run-1");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        let store = store();
        let logger = AuditLogger::new(store.clone());

        let err = logger
            .log(LogAuditEvent::default().correlation_id("run-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconciliationError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_log_inside_scope_picks_up_task_binding() {
        let store = store();
        let logger = AuditLogger::new(store.clone());
        let run = CorrelationId::parse("scoped-run").unwrap();

        let event = correlation::scope(run.clone(), async {
            logger
                .log(LogAuditEvent::new("MF", CheckpointStage::Landing, EventStatus::Success))
                .await
        })
        .await
        .unwrap();

        assert_eq!(event.correlation_id, run);
    }

    #[tokio::test]
    async fn test_log_rebound_inside_scope_uses_new_binding() {
        let store = store();
        let logger = AuditLogger::new(store.clone());

        let event = correlation::scope(CorrelationId::parse("request").unwrap(), async {
            correlation::set(CorrelationId::parse("batch-7").unwrap());
            logger
                .log(LogAuditEvent::new("MF", CheckpointStage::Landing, EventStatus::Success))
                .await
        })
        .await
        .unwrap();

        assert_eq!(event.correlation_id.as_str(), "batch-7");
    }

    /// Records the name of every span opened while it is the default.
    struct SpanNames(Arc<std::sync::Mutex<Vec<&'static str>>>);

    impl tracing::Subscriber for SpanNames {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, span: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            let mut names = self.0.lock().unwrap();
            names.push(span.metadata().name());
            tracing::span::Id::from_u64(names.len() as u64)
        }

        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

        fn event(&self, _: &tracing::Event<'_>) {}

        fn enter(&self, _: &tracing::span::Id) {}

        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[tokio::test]
    async fn test_log_runs_inside_its_own_span() {
        let names = Arc::new(std::sync::Mutex::new(Vec::new()));
        let _default = tracing::subscriber::set_default(SpanNames(Arc::clone(&names)));

        AuditLogger::new(store())
            .log(
                LogAuditEvent::new("MF", CheckpointStage::Landing, EventStatus::Success)
                    .correlation_id("run-1"),
            )
            .await
            .unwrap();

        assert!(names.lock().unwrap().contains(&"log"));
    }
}

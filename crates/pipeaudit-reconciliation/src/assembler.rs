//! Run assembly.
//!
//! A [`Run`] is every event of one correlation id, ordered by event time.
//! Ties on event time fall back to arrival time and then event id, so the
//! order depends only on the event set and never on how the store returned
//! it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pipeaudit_core::CorrelationId;
use pipeaudit_db::{AuditEvent, CheckpointStage};
use tracing::{debug, instrument};

use crate::metadata::CheckpointMetadata;
use crate::store::{EventStore, EventStoreError};

/// Ordered timeline of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    correlation_id: CorrelationId,
    events: Vec<AuditEvent>,
    metadata: Vec<Option<CheckpointMetadata>>,
    by_stage: BTreeMap<CheckpointStage, usize>,
}

impl Run {
    /// Builds a run from events in any order.
    ///
    /// Events carrying a different correlation id are dropped.
    pub fn from_events(correlation_id: CorrelationId, events: Vec<AuditEvent>) -> Self {
        let mut events: Vec<AuditEvent> = events
            .into_iter()
            .filter(|e| e.correlation_id == correlation_id)
            .collect();
        events.sort_by(|a, b| {
            a.event_timestamp
                .cmp(&b.event_timestamp)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        let metadata = events.iter().map(decode_metadata).collect();

        // Later events overwrite earlier ones for a repeated stage.
        let by_stage = events
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.checkpoint_stage, idx))
            .collect();

        Self {
            correlation_id,
            events,
            metadata,
            by_stage,
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Events in timeline order.
    #[must_use]
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Last event recorded for `stage`.
    #[must_use]
    pub fn event_for_stage(&self, stage: CheckpointStage) -> Option<&AuditEvent> {
        self.by_stage.get(&stage).map(|&idx| &self.events[idx])
    }

    /// Decoded metadata of the last event recorded for `stage`.
    #[must_use]
    pub fn metadata_for_stage(&self, stage: CheckpointStage) -> Option<&CheckpointMetadata> {
        self.by_stage
            .get(&stage)
            .and_then(|&idx| self.metadata[idx].as_ref())
    }

    /// Decoded metadata of the event at timeline position `index`. `None` when
    /// the event carried no payload or the payload was unreadable.
    #[must_use]
    pub fn metadata_at(&self, index: usize) -> Option<&CheckpointMetadata> {
        self.metadata.get(index).and_then(Option::as_ref)
    }

    /// Events paired with their decoded metadata, in timeline order.
    pub fn entries(&self) -> impl Iterator<Item = (&AuditEvent, Option<&CheckpointMetadata>)> {
        self.events
            .iter()
            .zip(self.metadata.iter().map(Option::as_ref))
    }

    /// Number of events whose metadata payload was present but unreadable.
    #[must_use]
    pub fn unreadable_metadata_count(&self) -> usize {
        self.events
            .iter()
            .zip(&self.metadata)
            .filter(|(event, decoded)| payload(event).is_some() && decoded.is_none())
            .count()
    }

    /// Stages that reported at least once, in pipeline order.
    pub fn stages_present(&self) -> impl Iterator<Item = CheckpointStage> + '_ {
        self.by_stage.keys().copied()
    }

    #[must_use]
    pub fn has_stage(&self, stage: CheckpointStage) -> bool {
        self.by_stage.contains_key(&stage)
    }

    #[must_use]
    pub fn first_event_time(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|e| e.event_timestamp)
    }

    #[must_use]
    pub fn last_event_time(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.event_timestamp)
    }

    /// Source system of the earliest event.
    #[must_use]
    pub fn source_system(&self) -> Option<&str> {
        self.events.first().map(|e| e.source_system.as_str())
    }

    /// First module name reported along the timeline.
    #[must_use]
    pub fn module_name(&self) -> Option<&str> {
        self.events.iter().find_map(|e| e.module_name.as_deref())
    }
}

fn payload(event: &AuditEvent) -> Option<&serde_json::Value> {
    event.metadata.as_ref().filter(|v| !v.is_null())
}

fn decode_metadata(event: &AuditEvent) -> Option<CheckpointMetadata> {
    let payload = payload(event)?;
    match CheckpointMetadata::decode(payload) {
        Ok(metadata) => Some(metadata),
        Err(error) => {
            debug!(
                event_id = %event.id,
                stage = %event.checkpoint_stage,
                error = %error,
                "Skipping unreadable checkpoint metadata"
            );
            None
        }
    }
}

/// Loads runs through an [`EventStore`].
#[derive(Clone)]
pub struct RunAssembler {
    store: Arc<dyn EventStore>,
}

impl RunAssembler {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Loads and orders every event of `correlation_id`. An unknown id yields
    /// an empty run. Store failures are returned as is.
    #[instrument(skip(self), fields(correlation_id = %correlation_id))]
    pub async fn assemble(&self, correlation_id: &CorrelationId) -> Result<Run, EventStoreError> {
        let events = self.store.find_by_correlation_id(correlation_id).await?;
        let run = Run::from_events(correlation_id.clone(), events);
        debug!(events = run.len(), "Assembled run timeline");
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pipeaudit_core::EventId;
    use pipeaudit_db::{EventStatus, NewAuditEvent};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap()
    }

    fn event(
        run: &str,
        stage: CheckpointStage,
        minutes: i64,
        metadata: Option<serde_json::Value>,
    ) -> AuditEvent {
        NewAuditEvent {
            correlation_id: CorrelationId::parse(run).unwrap(),
            source_system: "MAINFRAME".to_string(),
            module_name: Some("GL".to_string()),
            process_name: None,
            source_entity: None,
            destination_entity: None,
            key_identifier: None,
            checkpoint_stage: stage,
            status: EventStatus::Success,
            event_timestamp: t0() + Duration::minutes(minutes),
            message: None,
            metadata,
        }
        .into_event(EventId::new(), t0() + Duration::hours(2))
    }

    fn run_id() -> CorrelationId {
        CorrelationId::parse("run-1").unwrap()
    }

    #[test]
    fn test_events_sorted_by_timestamp() {
        let run = Run::from_events(
            run_id(),
            vec![
                event("run-1", CheckpointStage::OutputGenerated, 30, None),
                event("run-1", CheckpointStage::Landing, 0, None),
                event("run-1", CheckpointStage::LoadStart, 10, None),
            ],
        );

        let stages: Vec<_> = run.events().iter().map(|e| e.checkpoint_stage).collect();
        assert_eq!(
            stages,
            vec![
                CheckpointStage::Landing,
                CheckpointStage::LoadStart,
                CheckpointStage::OutputGenerated
            ]
        );
        assert_eq!(run.first_event_time(), Some(t0()));
        assert_eq!(run.last_event_time(), Some(t0() + Duration::minutes(30)));
    }

    #[test]
    fn test_timestamp_ties_fall_back_to_arrival_order() {
        let mut early = event("run-1", CheckpointStage::Landing, 0, None);
        let mut late = event("run-1", CheckpointStage::LoadStart, 0, None);
        early.created_at = t0();
        late.created_at = t0() + Duration::seconds(1);

        let forward = Run::from_events(run_id(), vec![early.clone(), late.clone()]);
        let reversed = Run::from_events(run_id(), vec![late, early]);

        assert_eq!(forward, reversed);
        assert_eq!(forward.events()[0].checkpoint_stage, CheckpointStage::Landing);
    }

    #[test]
    fn test_repeated_stage_is_last_write_wins() {
        let run = Run::from_events(
            run_id(),
            vec![
                event("run-1", CheckpointStage::Landing, 0, Some(json!({"recordCount": 1}))),
                event("run-1", CheckpointStage::Landing, 5, Some(json!({"recordCount": 2}))),
            ],
        );

        assert_eq!(run.len(), 2);
        assert_eq!(
            run.metadata_for_stage(CheckpointStage::Landing)
                .and_then(|m| m.record_count),
            Some(2)
        );
        assert_eq!(
            run.event_for_stage(CheckpointStage::Landing)
                .map(|e| e.event_timestamp),
            Some(t0() + Duration::minutes(5))
        );
    }

    #[test]
    fn test_unreadable_metadata_is_skipped() {
        let run = Run::from_events(
            run_id(),
            vec![
                event("run-1", CheckpointStage::Landing, 0, Some(json!([1, 2]))),
                event("run-1", CheckpointStage::LoadStart, 1, Some(json!({"rowsLoaded": 5}))),
            ],
        );

        assert!(run.metadata_at(0).is_none());
        assert_eq!(run.metadata_at(1).and_then(|m| m.rows_loaded), Some(5));
        assert_eq!(run.unreadable_metadata_count(), 1);
        assert!(run.has_stage(CheckpointStage::Landing));
    }

    #[test]
    fn test_foreign_events_are_dropped() {
        let run = Run::from_events(
            run_id(),
            vec![
                event("run-1", CheckpointStage::Landing, 0, None),
                event("run-2", CheckpointStage::LoadStart, 1, None),
            ],
        );
        assert_eq!(run.len(), 1);
        assert!(!run.has_stage(CheckpointStage::LoadStart));
    }

    #[test]
    fn test_empty_run() {
        let run = Run::from_events(run_id(), Vec::new());
        assert!(run.is_empty());
        assert_eq!(run.stages_present().count(), 0);
        assert_eq!(run.first_event_time(), None);
        assert_eq!(run.source_system(), None);
    }

    #[test]
    fn test_null_metadata_counts_as_absent() {
        let run = Run::from_events(
            run_id(),
            vec![event("run-1", CheckpointStage::Landing, 0, Some(json!(null)))],
        );
        assert!(run.metadata_at(0).is_none());
        assert_eq!(run.unreadable_metadata_count(), 0);
    }
}

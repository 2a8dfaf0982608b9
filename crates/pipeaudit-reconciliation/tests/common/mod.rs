//! Common fixtures for reconciliation integration tests.
//!
//! Everything runs against the in-memory event store; no database needed.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pipeaudit_core::{CorrelationId, EventId};
use pipeaudit_db::{AuditEvent, CheckpointStage, EventStatus, NewAuditEvent};
use pipeaudit_reconciliation::{EventStore, InMemoryEventStore, ReconciliationEngine};
use serde_json::Value as JsonValue;

/// Start of every fixture run.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap()
}

/// Detection instant used by tests that need reproducible reports.
pub fn detected_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

pub fn run_id(value: &str) -> CorrelationId {
    CorrelationId::parse(value).unwrap()
}

/// A checkpoint `minutes` after [`t0`].
pub fn checkpoint(
    run: &str,
    stage: CheckpointStage,
    minutes: i64,
    status: EventStatus,
    metadata: Option<JsonValue>,
) -> NewAuditEvent {
    NewAuditEvent {
        correlation_id: run_id(run),
        source_system: "MAINFRAME".to_string(),
        module_name: Some("GENERAL_LEDGER".to_string()),
        process_name: Some("nightly-gl-load".to_string()),
        source_entity: Some("GL.DAILY".to_string()),
        destination_entity: Some("gl_staging".to_string()),
        key_identifier: None,
        checkpoint_stage: stage,
        status,
        event_timestamp: t0() + Duration::minutes(minutes),
        message: Some(format!("{stage} reported")),
        metadata,
    }
}

/// Materializes events with distinct, increasing arrival times.
pub fn materialize(events: Vec<NewAuditEvent>) -> Vec<AuditEvent> {
    events
        .into_iter()
        .enumerate()
        .map(|(i, e)| e.into_event(EventId::new(), t0() + Duration::hours(12) + Duration::seconds(i as i64)))
        .collect()
}

/// Store seeded through the regular insert path.
pub async fn seeded_store(events: Vec<NewAuditEvent>) -> Arc<InMemoryEventStore> {
    let store = Arc::new(InMemoryEventStore::new());
    for event in events {
        store.insert(event).await.unwrap();
    }
    store
}

pub fn engine(store: Arc<InMemoryEventStore>) -> ReconciliationEngine {
    ReconciliationEngine::new(store)
}

/// Every stage once, ten minutes apart, all SUCCESS, matching record counts.
pub fn clean_run(run: &str) -> Vec<NewAuditEvent> {
    CheckpointStage::ALL
        .into_iter()
        .enumerate()
        .map(|(i, stage)| {
            let metadata = match stage {
                CheckpointStage::Landing | CheckpointStage::LoadComplete => {
                    Some(serde_json::json!({ "recordCount": 500, "controlTotal": "1250.00" }))
                }
                _ => None,
            };
            checkpoint(run, stage, i as i64 * 10, EventStatus::Success, metadata)
        })
        .collect()
}

//! Fuzz target for run assembly and discrepancy detection.
//!
//! Builds a run from arbitrary checkpoints and checks that detection and
//! report generation never panic and keep their ordering guarantees.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_run_detection -- -max_total_time=600

#![no_main]

use arbitrary::Arbitrary;
use chrono::{Duration, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use pipeaudit_core::{CorrelationId, EventId};
use pipeaudit_db::{CheckpointStage, EventStatus, NewAuditEvent};
use pipeaudit_reconciliation::{
    DiscrepancyDetector, ReconciliationConfig, ReportGenerator, Run,
};

#[derive(Arbitrary, Debug)]
struct Checkpoint {
    stage: u8,
    status: u8,
    minutes: u16,
    record_count: Option<i32>,
    raw_metadata: Option<String>,
}

fuzz_target!(|checkpoints: Vec<Checkpoint>| {
    if checkpoints.len() > 64 {
        return;
    }

    let run_id = CorrelationId::parse("fuzz-run").unwrap();
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let events = checkpoints
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let stage = CheckpointStage::ALL[usize::from(c.stage) % CheckpointStage::ALL.len()];
            let status = match c.status % 3 {
                0 => EventStatus::Success,
                1 => EventStatus::Failure,
                _ => EventStatus::Warning,
            };
            let metadata = match (c.record_count, c.raw_metadata) {
                (Some(n), _) => Some(serde_json::json!({ "recordCount": n })),
                (None, Some(raw)) => Some(serde_json::Value::String(raw)),
                (None, None) => None,
            };
            NewAuditEvent {
                correlation_id: run_id.clone(),
                source_system: "FUZZ".to_string(),
                module_name: None,
                process_name: None,
                source_entity: None,
                destination_entity: None,
                key_identifier: None,
                checkpoint_stage: stage,
                status,
                event_timestamp: t0 + Duration::minutes(i64::from(c.minutes)),
                message: None,
                metadata,
            }
            .into_event(EventId::new(), t0 + Duration::seconds(i as i64))
        })
        .collect();

    let run = Run::from_events(run_id, events);
    let detector = DiscrepancyDetector::new(&ReconciliationConfig::default());
    let discrepancies = detector.detect(&run, t0);

    for pair in discrepancies.windows(2) {
        assert!(pair[0].severity >= pair[1].severity);
    }

    let report = ReportGenerator::generate(&run, discrepancies, t0);
    assert_eq!(report.statistics.total_events as usize, run.len());
    assert_eq!(
        report.stage_event_counts.len(),
        CheckpointStage::ALL.len()
    );
});

//! End-to-end reconciliation scenarios.

mod common;

use common::*;
use pipeaudit_db::{CheckpointStage, EventStatus};
use pipeaudit_reconciliation::{DiscrepancyType, ReportFormat, ReportView, Severity};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn test_scenario_a_missing_stage_count_mismatch_and_timeout() {
    let store = seeded_store(vec![
        checkpoint("run-a", CheckpointStage::Landing, 0, EventStatus::Success, Some(json!({"recordCount": 1000}))),
        checkpoint("run-a", CheckpointStage::LoadComplete, 70, EventStatus::Success, Some(json!({"recordCount": 990}))),
        checkpoint("run-a", CheckpointStage::RulesApplied, 75, EventStatus::Success, None),
        checkpoint("run-a", CheckpointStage::OutputGenerated, 80, EventStatus::Success, None),
    ])
    .await;

    let report = engine(store).synthesize(&run_id("run-a")).await.unwrap();
    let found: Vec<_> = report
        .discrepancies
        .iter()
        .map(|d| (d.discrepancy_type, d.severity, d.checkpoint_stage))
        .collect();

    assert_eq!(
        found,
        vec![
            (DiscrepancyType::MissingCheckpoint, Severity::High, Some(CheckpointStage::LoadStart)),
            (DiscrepancyType::RecordCountMismatch, Severity::Medium, Some(CheckpointStage::LoadComplete)),
            (DiscrepancyType::ProcessingTimeout, Severity::Medium, Some(CheckpointStage::LoadComplete)),
        ]
    );

    let mismatch = &report.discrepancies[1];
    assert_eq!((mismatch.expected_value.as_str(), mismatch.actual_value.as_str()), ("1000", "990"));
    assert_eq!(report.discrepancies[2].actual_value, "70 minutes");

    assert!(!report.statistics.data_integrity_valid);
    assert_eq!(report.statistics.success_rate, 100.0);
    assert_eq!(report.overall_status, EventStatus::Success);
    assert_eq!(report.statistics.elapsed_seconds, 80 * 60);
    assert_eq!(report.missing_stages(), vec![CheckpointStage::LoadStart]);
}

#[tokio::test]
async fn test_scenario_b_excessive_failure_rate() {
    let statuses = [
        EventStatus::Failure,
        EventStatus::Success,
        EventStatus::Failure,
        EventStatus::Failure,
        EventStatus::Success,
        EventStatus::Failure,
        EventStatus::Success,
        EventStatus::Failure,
        EventStatus::Failure,
        EventStatus::Success,
    ];
    let events = statuses
        .iter()
        .enumerate()
        .map(|(i, &status)| {
            checkpoint("run-b", CheckpointStage::ALL[i % 5], i as i64 * 5, status, None)
        })
        .collect();
    let store = seeded_store(events).await;

    let report = engine(store).synthesize(&run_id("run-b")).await.unwrap();

    assert_eq!(report.discrepancies.len(), 1);
    let only = &report.discrepancies[0];
    assert_eq!(only.discrepancy_type, DiscrepancyType::ExcessiveFailureRate);
    assert_eq!(only.severity, Severity::High);
    assert_eq!(only.actual_value, "60% failures");
    assert_eq!(only.checkpoint_stage, None);

    assert!(!report.statistics.data_integrity_valid);
    assert_eq!(report.statistics.failure_count, 6);
    assert!((report.statistics.success_rate - 40.0).abs() < 1e-9);
    assert_eq!(report.overall_status, EventStatus::Failure);
}

#[tokio::test]
async fn test_scenario_c_clean_run() {
    let store = seeded_store(clean_run("run-c")).await;

    let report = engine(store).synthesize(&run_id("run-c")).await.unwrap();

    assert!(report.discrepancies.is_empty());
    assert!(report.statistics.data_integrity_valid);
    assert_eq!(report.statistics.success_rate, 100.0);
    assert_eq!(report.overall_status, EventStatus::Success);
    assert!(report.missing_stages().is_empty());
    assert_eq!(
        report.control_totals.get(&CheckpointStage::Landing),
        Some(&Decimal::new(125_000, 2))
    );
    assert_eq!(report.stage_timings.len(), 4);
    assert!(report.notes.is_empty());
}

#[tokio::test]
async fn test_empty_run_boundary() {
    let store = seeded_store(clean_run("some-other-run")).await;

    let report = engine(store).synthesize(&run_id("never-reported")).await.unwrap();

    assert_eq!(report.overall_status, EventStatus::Failure);
    assert_eq!(report.statistics.success_rate, 0.0);
    assert_eq!(report.statistics.total_events, 0);
    assert_eq!(report.discrepancies.len(), 5);
    assert!(report
        .discrepancies
        .iter()
        .all(|d| d.discrepancy_type == DiscrepancyType::MissingCheckpoint));
    let stages: Vec<_> = report
        .discrepancies
        .iter()
        .filter_map(|d| d.checkpoint_stage)
        .collect();
    assert_eq!(stages, CheckpointStage::ALL.to_vec());
    assert!(!report.notes.is_empty());
}

#[tokio::test]
async fn test_malformed_metadata_degrades_only_its_check() {
    let store = seeded_store(vec![
        checkpoint("run-m", CheckpointStage::Landing, 0, EventStatus::Success, Some(json!("not json at all"))),
        checkpoint("run-m", CheckpointStage::LoadStart, 5, EventStatus::Success, None),
        checkpoint("run-m", CheckpointStage::LoadComplete, 10, EventStatus::Success, Some(json!({"recordCount": 990}))),
        checkpoint("run-m", CheckpointStage::RulesApplied, 80, EventStatus::Success, None),
        checkpoint("run-m", CheckpointStage::OutputGenerated, 85, EventStatus::Success, None),
    ])
    .await;

    let report = engine(store).synthesize(&run_id("run-m")).await.unwrap();

    let kinds: Vec<_> = report.discrepancies.iter().map(|d| d.discrepancy_type).collect();
    assert_eq!(kinds, vec![DiscrepancyType::ProcessingTimeout]);
    assert!(report.notes.iter().any(|n| n.contains("unreadable metadata")));
}

#[tokio::test]
async fn test_report_projection_via_engine() {
    let store = seeded_store(clean_run("run-p")).await;
    let view = engine(store)
        .report(&run_id("run-p"), ReportFormat::Summary)
        .await
        .unwrap();

    match view {
        ReportView::Summary(summary) => {
            assert_eq!(summary.total_events, 5);
            assert!(summary.data_integrity_valid);
        }
        other => panic!("expected summary view, got {:?}", other.format()),
    }
}

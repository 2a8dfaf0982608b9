//! The standard detection rules.

use chrono::{DateTime, Utc};
use pipeaudit_db::{CheckpointStage, EventStatus};

use crate::assembler::Run;
use crate::discrepancy::{Discrepancy, DiscrepancyRule};
use crate::types::{DiscrepancyType, Severity};

/// Flags every expected stage that never reported.
#[derive(Debug, Clone)]
pub struct MissingCheckpointRule {
    expected: Vec<CheckpointStage>,
}

impl MissingCheckpointRule {
    /// Rule expecting only `stages`.
    #[must_use]
    pub fn expecting(stages: impl IntoIterator<Item = CheckpointStage>) -> Self {
        Self {
            expected: stages.into_iter().collect(),
        }
    }
}

impl Default for MissingCheckpointRule {
    /// Expects all five stages, LOAD_START included.
    fn default() -> Self {
        Self::expecting(CheckpointStage::ALL)
    }
}

impl DiscrepancyRule for MissingCheckpointRule {
    fn name(&self) -> &'static str {
        "missing_checkpoint"
    }

    fn evaluate(&self, run: &Run, detected_at: DateTime<Utc>) -> Vec<Discrepancy> {
        self.expected
            .iter()
            .filter(|stage| !run.has_stage(**stage))
            .map(|&stage| {
                Discrepancy::new(
                    run,
                    DiscrepancyType::MissingCheckpoint,
                    Severity::High,
                    detected_at,
                )
                .at_stage(stage)
                .values(stage.as_str(), "MISSING")
                .describe(format!("Checkpoint {stage} was never reported for this run"))
            })
            .collect()
    }
}

/// Compares the LANDING record count with the LOAD_COMPLETE record count.
///
/// Silent unless both counts decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCountMismatchRule;

impl DiscrepancyRule for RecordCountMismatchRule {
    fn name(&self) -> &'static str {
        "record_count_mismatch"
    }

    fn evaluate(&self, run: &Run, detected_at: DateTime<Utc>) -> Vec<Discrepancy> {
        let landed = run
            .metadata_for_stage(CheckpointStage::Landing)
            .and_then(|m| m.record_count);
        let loaded = run
            .metadata_for_stage(CheckpointStage::LoadComplete)
            .and_then(|m| m.record_count);
        let (Some(landed), Some(loaded)) = (landed, loaded) else {
            return Vec::new();
        };
        if landed == loaded {
            return Vec::new();
        }

        let mut discrepancy = Discrepancy::new(
            run,
            DiscrepancyType::RecordCountMismatch,
            Severity::Medium,
            detected_at,
        )
        .at_stage(CheckpointStage::LoadComplete)
        .values(landed.to_string(), loaded.to_string())
        .describe(format!(
            "Record count mismatch: {landed} records landed but {loaded} were loaded ({} difference)",
            landed.abs_diff(loaded)
        ));
        if let Some(event) = run.event_for_stage(CheckpointStage::LoadComplete) {
            discrepancy = discrepancy.triggered_by(event);
        }
        vec![discrepancy]
    }
}

/// Flags consecutive checkpoints more than `threshold_minutes` apart.
///
/// Gaps are measured in whole minutes, truncated.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingTimeoutRule {
    threshold_minutes: i64,
}

impl ProcessingTimeoutRule {
    #[must_use]
    pub fn new(threshold_minutes: i64) -> Self {
        Self { threshold_minutes }
    }
}

impl DiscrepancyRule for ProcessingTimeoutRule {
    fn name(&self) -> &'static str {
        "processing_timeout"
    }

    fn evaluate(&self, run: &Run, detected_at: DateTime<Utc>) -> Vec<Discrepancy> {
        run.events()
            .windows(2)
            .filter_map(|pair| {
                let (earlier, later) = (&pair[0], &pair[1]);
                let gap = (later.event_timestamp - earlier.event_timestamp).num_minutes();
                (gap > self.threshold_minutes).then(|| {
                    Discrepancy::new(
                        run,
                        DiscrepancyType::ProcessingTimeout,
                        Severity::Medium,
                        detected_at,
                    )
                    .triggered_by(later)
                    .values(
                        format!("< {} minutes", self.threshold_minutes),
                        format!("{gap} minutes"),
                    )
                    .describe(format!(
                        "Processing from {} to {} took {gap} minutes",
                        earlier.checkpoint_stage, later.checkpoint_stage
                    ))
                })
            })
            .collect()
    }
}

/// Flags a run whose share of FAILURE events exceeds `max_failure_rate`.
#[derive(Debug, Clone, Copy)]
pub struct ExcessiveFailureRateRule {
    max_failure_rate: f64,
}

impl ExcessiveFailureRateRule {
    #[must_use]
    pub fn new(max_failure_rate: f64) -> Self {
        Self { max_failure_rate }
    }
}

impl DiscrepancyRule for ExcessiveFailureRateRule {
    fn name(&self) -> &'static str {
        "excessive_failure_rate"
    }

    fn evaluate(&self, run: &Run, detected_at: DateTime<Utc>) -> Vec<Discrepancy> {
        let total = run.len();
        if total == 0 {
            return Vec::new();
        }
        let failures = run
            .events()
            .iter()
            .filter(|e| e.status == EventStatus::Failure)
            .count();
        let rate = failures as f64 / total as f64;
        if rate <= self.max_failure_rate {
            return Vec::new();
        }

        vec![Discrepancy::new(
            run,
            DiscrepancyType::ExcessiveFailureRate,
            Severity::High,
            detected_at,
        )
        .values(
            format!("< {}% failures", percent(self.max_failure_rate)),
            format!("{}% failures", percent(rate)),
        )
        .describe(format!("{failures} of {total} checkpoint events reported FAILURE"))]
    }
}

/// Renders a ratio as a percentage with at most one decimal place.
fn percent(ratio: f64) -> String {
    let tenths = (ratio * 1000.0).round() / 10.0;
    if tenths.fract() == 0.0 {
        format!("{tenths:.0}")
    } else {
        format!("{tenths:.1}")
    }
}

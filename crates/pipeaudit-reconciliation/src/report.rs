//! Reconciliation report synthesis and projections.
//!
//! [`ReportGenerator`] folds a run and its findings into one
//! [`ReconciliationReport`]. The Standard, Detailed and Summary views are
//! read-only reductions of that report and never re-run detection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pipeaudit_core::CorrelationId;
use pipeaudit_db::{CheckpointStage, EventStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assembler::Run;
use crate::discrepancy::Discrepancy;
use crate::statistics::RunStatistics;
use crate::types::ReportFormat;

/// Elapsed time between two consecutive checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub from_stage: CheckpointStage,
    pub to_stage: CheckpointStage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
}

/// Complete reconciliation result for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub correlation_id: CorrelationId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_system: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_completed_at: Option<DateTime<Utc>>,
    pub overall_status: EventStatus,
    /// Events per stage; every stage is listed, absent ones with zero.
    pub stage_event_counts: BTreeMap<CheckpointStage, u32>,
    /// Sum of control totals per stage; stages without one are omitted.
    pub control_totals: BTreeMap<CheckpointStage, Decimal>,
    /// Findings, highest severity first.
    pub discrepancies: Vec<Discrepancy>,
    pub statistics: RunStatistics,
    pub stage_timings: Vec<StageTiming>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

impl ReconciliationReport {
    /// Renders the requested view.
    #[must_use]
    pub fn project(&self, format: ReportFormat) -> ReportView {
        match format {
            ReportFormat::Standard => ReportView::Standard(self.standard()),
            ReportFormat::Detailed => ReportView::Detailed(self.detailed()),
            ReportFormat::Summary => ReportView::Summary(self.summary()),
        }
    }

    #[must_use]
    pub fn standard(&self) -> StandardReport {
        StandardReport {
            correlation_id: self.correlation_id.clone(),
            source_system: self.source_system.clone(),
            generated_at: self.generated_at,
            run_started_at: self.run_started_at,
            run_completed_at: self.run_completed_at,
            overall_status: self.overall_status,
            stage_event_counts: self.stage_event_counts.clone(),
            control_totals: self.control_totals.clone(),
            discrepancy_count: self.statistics.discrepancy_count,
            summary: BasicSummary {
                total_events: self.statistics.total_events,
                success_count: self.statistics.success_count,
                failure_count: self.statistics.failure_count,
                warning_count: self.statistics.warning_count,
                success_rate: self.statistics.success_rate,
                data_integrity_valid: self.statistics.data_integrity_valid,
            },
        }
    }

    #[must_use]
    pub fn detailed(&self) -> DetailedReport {
        DetailedReport {
            performance: PerformanceMetrics::from_report(self),
            report: self.clone(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> SummaryReport {
        SummaryReport {
            correlation_id: self.correlation_id.clone(),
            overall_status: self.overall_status,
            total_events: self.statistics.total_events,
            success_rate: self.statistics.success_rate,
            elapsed_seconds: self.statistics.elapsed_seconds,
            discrepancy_count: self.statistics.discrepancy_count,
            data_integrity_valid: self.statistics.data_integrity_valid,
        }
    }

    /// Stages that never reported, in pipeline order.
    #[must_use]
    pub fn missing_stages(&self) -> Vec<CheckpointStage> {
        self.stage_event_counts
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&stage, _)| stage)
            .collect()
    }
}

/// Event tallies shared by the Standard view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicSummary {
    pub total_events: u32,
    pub success_count: u32,
    pub failure_count: u32,
    pub warning_count: u32,
    pub success_rate: f64,
    pub data_integrity_valid: bool,
}

/// Stage counts, control totals and a discrepancy count. No finding detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardReport {
    pub correlation_id: CorrelationId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_system: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_completed_at: Option<DateTime<Utc>>,
    pub overall_status: EventStatus,
    pub stage_event_counts: BTreeMap<CheckpointStage, u32>,
    pub control_totals: BTreeMap<CheckpointStage, Decimal>,
    pub discrepancy_count: u32,
    pub summary: BasicSummary,
}

/// Performance metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Total duration in seconds.
    pub total_elapsed_seconds: i64,
    /// Checkpoint events per minute of run time.
    pub events_per_minute: f64,
    /// The longest stage-to-stage transition.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub slowest_transition: Option<StageTiming>,
}

impl PerformanceMetrics {
    /// Calculate from a report's statistics and timings.
    #[must_use]
    pub fn from_report(report: &ReconciliationReport) -> Self {
        let stats = &report.statistics;
        let events_per_minute = if stats.elapsed_seconds > 0 {
            f64::from(stats.total_events) * 60.0 / stats.elapsed_seconds as f64
        } else {
            0.0
        };

        // First of equally slow transitions wins.
        let slowest_transition = report
            .stage_timings
            .iter()
            .fold(None::<&StageTiming>, |slowest, timing| match slowest {
                Some(s) if s.elapsed_seconds >= timing.elapsed_seconds => Some(s),
                _ => Some(timing),
            })
            .cloned();

        Self {
            total_elapsed_seconds: stats.elapsed_seconds,
            events_per_minute,
            slowest_transition,
        }
    }
}

/// The full report plus a performance breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedReport {
    #[serde(flatten)]
    pub report: ReconciliationReport,
    pub performance: PerformanceMetrics,
}

/// Totals, success rate, elapsed time and the integrity verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub correlation_id: CorrelationId,
    pub overall_status: EventStatus,
    pub total_events: u32,
    pub success_rate: f64,
    pub elapsed_seconds: i64,
    pub discrepancy_count: u32,
    pub data_integrity_valid: bool,
}

/// One projection of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportView {
    Standard(StandardReport),
    Detailed(DetailedReport),
    Summary(SummaryReport),
}

impl ReportView {
    #[must_use]
    pub fn format(&self) -> ReportFormat {
        match self {
            Self::Standard(_) => ReportFormat::Standard,
            Self::Detailed(_) => ReportFormat::Detailed,
            Self::Summary(_) => ReportFormat::Summary,
        }
    }
}

/// Report generator.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Folds a run and its already-sorted findings into a report stamped
    /// `generated_at`.
    #[must_use]
    pub fn generate(
        run: &Run,
        discrepancies: Vec<Discrepancy>,
        generated_at: DateTime<Utc>,
    ) -> ReconciliationReport {
        let statistics = RunStatistics::compute(run, &discrepancies);

        let mut stage_event_counts: BTreeMap<CheckpointStage, u32> =
            CheckpointStage::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut control_totals: BTreeMap<CheckpointStage, Decimal> = BTreeMap::new();
        for (event, metadata) in run.entries() {
            *stage_event_counts.entry(event.checkpoint_stage).or_insert(0) += 1;
            if let Some(total) = metadata.and_then(|m| m.control_total) {
                *control_totals
                    .entry(event.checkpoint_stage)
                    .or_insert(Decimal::ZERO) += total;
            }
        }

        let stage_timings = run
            .events()
            .windows(2)
            .map(|pair| StageTiming {
                from_stage: pair[0].checkpoint_stage,
                to_stage: pair[1].checkpoint_stage,
                started_at: pair[0].event_timestamp,
                finished_at: pair[1].event_timestamp,
                elapsed_seconds: (pair[1].event_timestamp - pair[0].event_timestamp).num_seconds(),
            })
            .collect();

        let mut notes = Vec::new();
        if run.is_empty() {
            notes.push(format!(
                "No checkpoint events recorded for this run: 0 of {} stages covered",
                CheckpointStage::ALL.len()
            ));
        }
        let unreadable = run.unreadable_metadata_count();
        if unreadable > 0 {
            notes.push(format!(
                "{unreadable} event(s) carried unreadable metadata; checks depending on it were skipped"
            ));
        }

        ReconciliationReport {
            correlation_id: run.correlation_id().clone(),
            source_system: run.source_system().map(str::to_string),
            generated_at,
            run_started_at: run.first_event_time(),
            run_completed_at: run.last_event_time(),
            overall_status: overall_status(run),
            stage_event_counts,
            control_totals,
            discrepancies,
            statistics,
            stage_timings,
            notes,
        }
    }
}

/// FAILURE beats WARNING beats SUCCESS. A run with no events is a FAILURE.
fn overall_status(run: &Run) -> EventStatus {
    let statuses = || run.events().iter().map(|e| e.status);
    if run.is_empty() || statuses().any(|s| s == EventStatus::Failure) {
        EventStatus::Failure
    } else if statuses().any(|s| s == EventStatus::Warning) {
        EventStatus::Warning
    } else {
        EventStatus::Success
    }
}

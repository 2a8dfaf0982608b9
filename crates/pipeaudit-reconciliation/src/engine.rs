//! Reconciliation engine orchestrator.
//!
//! Main entry point for report synthesis and ad hoc discrepancy detection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pipeaudit_core::{AuditError, CorrelationId};
use pipeaudit_db::{AuditEvent, EventStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::assembler::{Run, RunAssembler};
use crate::discrepancy::{sort_discrepancies, Discrepancy, DiscrepancyDetector, DiscrepancyFilter};
use crate::report::{ReconciliationReport, ReportGenerator, ReportView};
use crate::store::{EventStore, EventStoreError};
use crate::types::ReportFormat;

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Largest allowed gap between consecutive checkpoints, in minutes.
    #[serde(default = "default_processing_timeout_minutes")]
    pub processing_timeout_minutes: i64,
    /// Largest allowed share of FAILURE events (0.0 to 1.0).
    #[serde(default = "default_max_failure_rate")]
    pub max_failure_rate: f64,
}

fn default_processing_timeout_minutes() -> i64 {
    60
}

fn default_max_failure_rate() -> f64 {
    0.5
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            processing_timeout_minutes: default_processing_timeout_minutes(),
            max_failure_rate: default_max_failure_rate(),
        }
    }
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error(transparent)]
    Validation(#[from] AuditError),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// Result type for reconciliation operations.
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

/// Per-status event counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: i64,
    pub failure: i64,
    pub warning: i64,
}

/// Reconciliation engine.
pub struct ReconciliationEngine {
    store: Arc<dyn EventStore>,
    assembler: RunAssembler,
    detector: DiscrepancyDetector,
    config: ReconciliationConfig,
}

impl ReconciliationEngine {
    /// Engine with the default thresholds.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_config(store, ReconciliationConfig::default())
    }

    /// Engine whose standard rules use `config`'s thresholds.
    pub fn with_config(store: Arc<dyn EventStore>, config: ReconciliationConfig) -> Self {
        Self {
            assembler: RunAssembler::new(Arc::clone(&store)),
            detector: DiscrepancyDetector::new(&config),
            store,
            config,
        }
    }

    /// Replaces the rule set.
    #[must_use]
    pub fn with_detector(mut self, detector: DiscrepancyDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    pub fn detector(&self) -> &DiscrepancyDetector {
        &self.detector
    }

    /// Ordered timeline of one run.
    pub async fn assemble(&self, correlation_id: &CorrelationId) -> ReconciliationResult<Run> {
        Ok(self.assembler.assemble(correlation_id).await?)
    }

    /// Ordered events of one run.
    pub async fn timeline(
        &self,
        correlation_id: &CorrelationId,
    ) -> ReconciliationResult<Vec<AuditEvent>> {
        Ok(self.assemble(correlation_id).await?.events().to_vec())
    }

    /// Synthesizes the report for one run, stamped with the current time.
    pub async fn synthesize(
        &self,
        correlation_id: &CorrelationId,
    ) -> ReconciliationResult<ReconciliationReport> {
        self.synthesize_at(correlation_id, Utc::now()).await
    }

    /// Synthesizes the report for one run using `at` as both detection and
    /// generation time. Same events and same `at` give an identical report.
    #[instrument(skip(self), fields(correlation_id = %correlation_id))]
    pub async fn synthesize_at(
        &self,
        correlation_id: &CorrelationId,
        at: DateTime<Utc>,
    ) -> ReconciliationResult<ReconciliationReport> {
        let run = self.assembler.assemble(correlation_id).await?;
        let discrepancies = self.detector.detect(&run, at);
        let report = ReportGenerator::generate(&run, discrepancies, at);

        info!(
            correlation_id = %correlation_id,
            events = report.statistics.total_events,
            discrepancies = report.statistics.discrepancy_count,
            overall_status = %report.overall_status,
            data_integrity_valid = report.statistics.data_integrity_valid,
            "Synthesized reconciliation report"
        );

        Ok(report)
    }

    /// Synthesizes a report and renders one projection of it.
    pub async fn report(
        &self,
        correlation_id: &CorrelationId,
        format: ReportFormat,
    ) -> ReconciliationResult<ReportView> {
        Ok(self.synthesize(correlation_id).await?.project(format))
    }

    /// Detects discrepancies across every run with at least one event
    /// matching `filter`.
    pub async fn detect_discrepancies(
        &self,
        filter: &DiscrepancyFilter,
    ) -> ReconciliationResult<Vec<Discrepancy>> {
        self.detect_discrepancies_at(filter, Utc::now()).await
    }

    /// As [`Self::detect_discrepancies`] with a fixed detection time.
    ///
    /// Matching events only select runs; each selected run is assembled in
    /// full before the rules see it. Runs are processed in ascending
    /// correlation id order.
    #[instrument(skip(self))]
    pub async fn detect_discrepancies_at(
        &self,
        filter: &DiscrepancyFilter,
        at: DateTime<Utc>,
    ) -> ReconciliationResult<Vec<Discrepancy>> {
        filter.validate()?;

        let matching = self
            .store
            .find_by_time_range(filter.start, filter.end, &filter.event_filter())
            .await?;
        let mut correlation_ids: Vec<CorrelationId> =
            matching.into_iter().map(|e| e.correlation_id).collect();
        correlation_ids.sort();
        correlation_ids.dedup();

        let mut found = Vec::new();
        for correlation_id in &correlation_ids {
            let run = self.assembler.assemble(correlation_id).await?;
            found.extend(
                self.detector
                    .detect(&run, at)
                    .into_iter()
                    .filter(|d| filter.matches(d)),
            );
        }
        sort_discrepancies(&mut found);

        info!(
            runs = correlation_ids.len(),
            discrepancies = found.len(),
            "Detected discrepancies"
        );

        Ok(found)
    }

    /// Number of events of one run that reported `status`.
    pub async fn count_by_status(
        &self,
        correlation_id: &CorrelationId,
        status: EventStatus,
    ) -> ReconciliationResult<i64> {
        Ok(self
            .store
            .count_by_correlation_id_and_status(correlation_id, status)
            .await?)
    }

    /// Event counts of one run for every status.
    pub async fn status_counts(
        &self,
        correlation_id: &CorrelationId,
    ) -> ReconciliationResult<StatusCounts> {
        Ok(StatusCounts {
            success: self.count_by_status(correlation_id, EventStatus::Success).await?,
            failure: self.count_by_status(correlation_id, EventStatus::Failure).await?,
            warning: self.count_by_status(correlation_id, EventStatus::Warning).await?,
        })
    }
}

//! Discrepancy model and detector.
//!
//! Detection is a registry of independent [`DiscrepancyRule`]s. Each rule
//! looks at one [`Run`] and returns its findings; the detector concatenates
//! them in registration order and sorts the result.

use chrono::{DateTime, Utc};
use pipeaudit_core::{AuditError, CorrelationId};
use pipeaudit_db::{AuditEvent, CheckpointStage, EventFilter, EventStatus};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::assembler::Run;
use crate::engine::ReconciliationConfig;
use crate::rules::{
    ExcessiveFailureRateRule, MissingCheckpointRule, ProcessingTimeoutRule,
    RecordCountMismatchRule,
};
use crate::types::{DiscrepancyStatus, DiscrepancyType, Severity};

/// A detected deviation from expected pipeline behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub correlation_id: CorrelationId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub module_name: Option<String>,
    #[serde(rename = "type")]
    pub discrepancy_type: DiscrepancyType,
    pub severity: Severity,
    pub expected_value: String,
    pub actual_value: String,
    /// Stage the finding is anchored to; run-level findings have none.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub checkpoint_stage: Option<CheckpointStage>,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub status: DiscrepancyStatus,
}

impl Discrepancy {
    /// Starts an `Open` finding for `run`, attributed to the run's source
    /// system and module.
    #[must_use]
    pub fn new(
        run: &Run,
        discrepancy_type: DiscrepancyType,
        severity: Severity,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            correlation_id: run.correlation_id().clone(),
            source_system: run.source_system().map(str::to_string),
            module_name: run.module_name().map(str::to_string),
            discrepancy_type,
            severity,
            expected_value: String::new(),
            actual_value: String::new(),
            checkpoint_stage: None,
            description: String::new(),
            detected_at,
            status: DiscrepancyStatus::Open,
        }
    }

    /// Attributes the finding to `event` and anchors it at its stage.
    #[must_use]
    pub fn triggered_by(mut self, event: &AuditEvent) -> Self {
        self.source_system = Some(event.source_system.clone());
        if event.module_name.is_some() {
            self.module_name.clone_from(&event.module_name);
        }
        self.checkpoint_stage = Some(event.checkpoint_stage);
        self
    }

    #[must_use]
    pub fn at_stage(mut self, stage: CheckpointStage) -> Self {
        self.checkpoint_stage = Some(stage);
        self
    }

    #[must_use]
    pub fn values(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected_value = expected.into();
        self.actual_value = actual.into();
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One independent detection rule.
pub trait DiscrepancyRule: Send + Sync {
    /// Stable rule name, used in logs.
    fn name(&self) -> &'static str;

    /// Findings for `run`, stamped with `detected_at`.
    fn evaluate(&self, run: &Run, detected_at: DateTime<Utc>) -> Vec<Discrepancy>;
}

/// Orders findings by severity (highest first), then by detection time
/// (latest first). The sort is stable.
pub fn sort_discrepancies(discrepancies: &mut [Discrepancy]) {
    discrepancies.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.detected_at.cmp(&a.detected_at))
    });
}

/// Runs a registered list of rules against a run.
pub struct DiscrepancyDetector {
    rules: Vec<Box<dyn DiscrepancyRule>>,
}

impl DiscrepancyDetector {
    /// Detector with the four standard rules, thresholds taken from `config`.
    #[must_use]
    pub fn new(config: &ReconciliationConfig) -> Self {
        Self::empty()
            .with_rule(MissingCheckpointRule::default())
            .with_rule(RecordCountMismatchRule)
            .with_rule(ProcessingTimeoutRule::new(config.processing_timeout_minutes))
            .with_rule(ExcessiveFailureRateRule::new(config.max_failure_rate))
    }

    /// Detector with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl DiscrepancyRule + 'static) -> Self {
        self.register(Box::new(rule));
        self
    }

    pub fn register(&mut self, rule: Box<dyn DiscrepancyRule>) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Evaluates every rule and returns the sorted findings.
    #[must_use]
    pub fn detect(&self, run: &Run, detected_at: DateTime<Utc>) -> Vec<Discrepancy> {
        let mut found = Vec::new();
        for rule in &self.rules {
            let findings = rule.evaluate(run, detected_at);
            trace!(rule = rule.name(), findings = findings.len(), "Rule evaluated");
            found.extend(findings);
        }
        sort_discrepancies(&mut found);
        found
    }
}

impl Default for DiscrepancyDetector {
    fn default() -> Self {
        Self::new(&ReconciliationConfig::default())
    }
}

/// Scope of an ad hoc, multi-run detection.
///
/// Time window, source, module and status select which runs are examined;
/// `severity` keeps only findings of exactly that severity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub source_system: Option<String>,
    pub module_name: Option<String>,
    pub status: Option<EventStatus>,
    pub severity: Option<Severity>,
}

impl DiscrepancyFilter {
    /// Rejects an inverted time window.
    pub fn validate(&self) -> pipeaudit_core::Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(AuditError::validation("start", "must not be after end"));
            }
        }
        Ok(())
    }

    /// The run-selection part of the filter.
    #[must_use]
    pub fn event_filter(&self) -> EventFilter {
        EventFilter {
            source_system: self.source_system.clone(),
            module_name: self.module_name.clone(),
            status: self.status,
        }
    }

    /// Severity post-filter.
    #[must_use]
    pub fn matches(&self, discrepancy: &Discrepancy) -> bool {
        self.severity.is_none_or(|s| discrepancy.severity == s)
    }
}

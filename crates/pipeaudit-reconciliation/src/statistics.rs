//! Summary statistics for a reconciled run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pipeaudit_db::EventStatus;

use crate::assembler::Run;
use crate::discrepancy::Discrepancy;
use crate::types::DiscrepancyType;

/// Statistics for a reconciled run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Total number of checkpoint events.
    #[serde(default)]
    pub total_events: u32,
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default)]
    pub warning_count: u32,
    /// `success_count / total_events * 100`, zero for an empty run.
    #[serde(default)]
    pub success_rate: f64,
    /// Seconds between the first and last event.
    #[serde(default)]
    pub elapsed_seconds: i64,
    /// Total discrepancies found.
    #[serde(default)]
    pub discrepancy_count: u32,
    /// Discrepancies broken down by type.
    #[serde(default)]
    pub discrepancies_by_type: BTreeMap<DiscrepancyType, u32>,
    /// False when any HIGH or CRITICAL discrepancy exists.
    #[serde(default)]
    pub data_integrity_valid: bool,
}

impl RunStatistics {
    /// Computes statistics from a run and its findings.
    #[must_use]
    pub fn compute(run: &Run, discrepancies: &[Discrepancy]) -> Self {
        let count = |status: EventStatus| {
            saturating_u32(run.events().iter().filter(|e| e.status == status).count())
        };

        let total_events = saturating_u32(run.len());
        let success_count = count(EventStatus::Success);

        let elapsed_seconds = match (run.first_event_time(), run.last_event_time()) {
            (Some(first), Some(last)) => (last - first).num_seconds(),
            _ => 0,
        };

        let mut discrepancies_by_type = BTreeMap::new();
        for d in discrepancies {
            *discrepancies_by_type.entry(d.discrepancy_type).or_insert(0) += 1;
        }

        Self {
            total_events,
            success_count,
            failure_count: count(EventStatus::Failure),
            warning_count: count(EventStatus::Warning),
            success_rate: percentage(success_count, total_events),
            elapsed_seconds,
            discrepancy_count: saturating_u32(discrepancies.len()),
            discrepancies_by_type,
            data_integrity_valid: !discrepancies.iter().any(|d| d.severity.breaks_integrity()),
        }
    }

    /// Share of FAILURE events, as a percentage.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        percentage(self.failure_count, self.total_events)
    }

    /// Get count for a specific discrepancy type.
    #[must_use]
    pub fn discrepancy_count_of(&self, discrepancy_type: DiscrepancyType) -> u32 {
        self.discrepancies_by_type
            .get(&discrepancy_type)
            .copied()
            .unwrap_or(0)
    }
}

fn percentage(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        (f64::from(part) / f64::from(total)) * 100.0
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

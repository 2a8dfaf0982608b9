//! Reconciliation enumerations.

use pipeaudit_core::AuditError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of anomaly a detection rule reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyType {
    /// An expected checkpoint never reported.
    MissingCheckpoint,
    /// LANDING and LOAD_COMPLETE disagree on the record count.
    RecordCountMismatch,
    /// Too long between two consecutive checkpoints.
    ProcessingTimeout,
    /// Too many checkpoints reported FAILURE.
    ExcessiveFailureRate,
}

impl fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCheckpoint => write!(f, "MISSING_CHECKPOINT"),
            Self::RecordCountMismatch => write!(f, "RECORD_COUNT_MISMATCH"),
            Self::ProcessingTimeout => write!(f, "PROCESSING_TIMEOUT"),
            Self::ExcessiveFailureRate => write!(f, "EXCESSIVE_FAILURE_RATE"),
        }
    }
}

/// Discrepancy severity. Declaration order is ascending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// HIGH and CRITICAL findings invalidate a run's data integrity.
    #[must_use]
    pub fn breaks_integrity(&self) -> bool {
        *self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl FromStr for Severity {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(AuditError::unknown("severity", s)),
        }
    }
}

/// Operator triage state. Detection always produces `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyStatus {
    #[default]
    Open,
    Investigating,
    Resolved,
    FalsePositive,
    Acknowledged,
}

/// Which projection of a report to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Standard,
    Detailed,
    Summary,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Detailed => write!(f, "detailed"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "detailed" => Ok(Self::Detailed),
            "summary" => Ok(Self::Summary),
            _ => Err(AuditError::unknown("report format", s)),
        }
    }
}

//! # Pipeline Reconciliation
//!
//! Correlates the checkpoint events of a batch pipeline run, detects the
//! ways a run can silently go wrong and synthesizes a reconciliation report.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     ReconciliationEngine                       │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │  ┌──────────────┐    ┌───────────────┐    ┌─────────────────┐  │
//! │  │ RunAssembler │───►│  Discrepancy  │───►│ ReportGenerator │  │
//! │  │              │    │   Detector    │    │ + projections   │  │
//! │  └──────────────┘    └───────────────┘    └─────────────────┘  │
//! │          │                   │                                 │
//! │          ▼                   ▼                                 │
//! │  ┌──────────────┐    ┌───────────────┐                         │
//! │  │  EventStore  │    │  rule registry│                         │
//! │  │  + metadata  │    │  (4 standard) │                         │
//! │  └──────────────┘    └───────────────┘                         │
//! │                                                                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use pipeaudit_reconciliation::{InMemoryEventStore, ReconciliationEngine, ReportFormat};
//!
//! let engine = ReconciliationEngine::new(Arc::new(InMemoryEventStore::new()));
//! let report = engine.synthesize(&correlation_id).await?;
//! let summary = report.project(ReportFormat::Summary);
//! ```

pub mod assembler;
pub mod discrepancy;
pub mod engine;
pub mod logger;
pub mod metadata;
pub mod report;
pub mod rules;
pub mod statistics;
pub mod store;
pub mod types;

pub use assembler::{Run, RunAssembler};
pub use discrepancy::{
    sort_discrepancies, Discrepancy, DiscrepancyDetector, DiscrepancyFilter, DiscrepancyRule,
};
pub use engine::{
    ReconciliationConfig, ReconciliationEngine, ReconciliationError, ReconciliationResult,
    StatusCounts,
};
pub use logger::{AuditLogger, LogAuditEvent};
pub use metadata::{CheckpointMetadata, MetadataError};
pub use report::{
    BasicSummary, DetailedReport, PerformanceMetrics, ReconciliationReport, ReportGenerator,
    ReportView, StageTiming, StandardReport, SummaryReport,
};
pub use rules::{
    ExcessiveFailureRateRule, MissingCheckpointRule, ProcessingTimeoutRule,
    RecordCountMismatchRule,
};
pub use statistics::RunStatistics;
pub use store::{EventStore, EventStoreError, InMemoryEventStore, PgEventStore};
pub use types::{DiscrepancyStatus, DiscrepancyType, ReportFormat, Severity};

//! Router configuration for the audit API.

use axum::{
    routing::{get, post},
    Router,
};
use pipeaudit_correlation::{CorrelationConfig, CorrelationLayer};
use pipeaudit_reconciliation::{
    AuditLogger, EventStore, ReconciliationConfig, ReconciliationEngine,
};
use std::sync::Arc;

use crate::handlers;

/// Shared state for audit API handlers.
#[derive(Clone)]
pub struct AuditApiState {
    pub engine: Arc<ReconciliationEngine>,
    pub logger: Arc<AuditLogger>,
}

impl AuditApiState {
    /// Builds the engine and logger over one store.
    pub fn new(store: Arc<dyn EventStore>, config: ReconciliationConfig) -> Self {
        Self {
            engine: Arc::new(ReconciliationEngine::with_config(
                Arc::clone(&store),
                config,
            )),
            logger: Arc::new(AuditLogger::new(store)),
        }
    }
}

/// Create the audit API router with the default correlation middleware.
///
/// ```ignore
/// use pipeaudit_api::{audit_routes, AuditApiState};
///
/// let state = AuditApiState::new(store, ReconciliationConfig::default());
/// let app = Router::new().nest("/api/v1/audit", audit_routes(state));
/// ```
pub fn audit_routes(state: AuditApiState) -> Router {
    audit_routes_with_correlation(state, CorrelationConfig::default())
}

/// As [`audit_routes`] with custom correlation settings.
pub fn audit_routes_with_correlation(
    state: AuditApiState,
    correlation: CorrelationConfig,
) -> Router {
    Router::new()
        .route("/events", post(handlers::log_event))
        .route("/runs/:correlation_id/events", get(handlers::list_run_events))
        .route("/runs/:correlation_id/report", get(handlers::get_report))
        .route(
            "/runs/:correlation_id/status-counts",
            get(handlers::get_status_counts),
        )
        .route("/discrepancies", get(handlers::list_discrepancies))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(CorrelationLayer::with_config(correlation))
}

//! Per-run timeline, report and status count endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use pipeaudit_core::CorrelationId;
use pipeaudit_reconciliation::ReportView;

use crate::error::ApiResult;
use crate::models::{ReportQuery, RunEventsResponse, StatusCountsResponse};
use crate::router::AuditApiState;

/// `GET /runs/:correlation_id/events`
pub async fn list_run_events(
    State(state): State<AuditApiState>,
    Path(correlation_id): Path<String>,
) -> ApiResult<Json<RunEventsResponse>> {
    let correlation_id = CorrelationId::parse(correlation_id)?;

    let events = state.engine.timeline(&correlation_id).await?;

    Ok(Json(RunEventsResponse {
        correlation_id,
        total: events.len(),
        events,
    }))
}

/// `GET /runs/:correlation_id/report?format=standard|detailed|summary`
///
/// Synthesizes the reconciliation report and renders the requested
/// projection. Defaults to `standard`.
pub async fn get_report(
    State(state): State<AuditApiState>,
    Path(correlation_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<ReportView>> {
    let correlation_id = CorrelationId::parse(correlation_id)?;
    let format = query.format()?;

    let view = state.engine.report(&correlation_id, format).await?;

    Ok(Json(view))
}

/// `GET /runs/:correlation_id/status-counts`
pub async fn get_status_counts(
    State(state): State<AuditApiState>,
    Path(correlation_id): Path<String>,
) -> ApiResult<Json<StatusCountsResponse>> {
    let correlation_id = CorrelationId::parse(correlation_id)?;

    let counts = state.engine.status_counts(&correlation_id).await?;

    Ok(Json(StatusCountsResponse::new(correlation_id, counts)))
}

//! Ad hoc discrepancy detection across runs.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::ApiResult;
use crate::models::{DiscrepancyQuery, ListDiscrepanciesResponse};
use crate::router::AuditApiState;

/// `GET /discrepancies?start&end&source_system&module_name&status&severity`
///
/// Every run with an event matching the window and filters is assembled in
/// full and checked. `severity` keeps only findings of exactly that level.
pub async fn list_discrepancies(
    State(state): State<AuditApiState>,
    Query(query): Query<DiscrepancyQuery>,
) -> ApiResult<Json<ListDiscrepanciesResponse>> {
    let filter = query.into_filter()?;

    let discrepancies = state.engine.detect_discrepancies(&filter).await?;

    Ok(Json(ListDiscrepanciesResponse {
        total: discrepancies.len(),
        discrepancies,
    }))
}

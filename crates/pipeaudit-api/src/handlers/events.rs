//! Checkpoint event ingestion.

use axum::{extract::State, http::StatusCode, Json};
use pipeaudit_db::AuditEvent;
use validator::Validate;

use crate::error::ApiResult;
use crate::models::LogEventRequest;
use crate::router::AuditApiState;

/// Log one checkpoint event.
///
/// `POST /events` - responds `201` with the stored event. The correlation id
/// falls back to the one bound by the correlation middleware.
pub async fn log_event(
    State(state): State<AuditApiState>,
    Json(request): Json<LogEventRequest>,
) -> ApiResult<(StatusCode, Json<AuditEvent>)> {
    request.validate()?;

    let event = state.logger.log(request.into_log_event()?).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

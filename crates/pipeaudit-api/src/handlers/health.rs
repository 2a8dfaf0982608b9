use axum::Json;
use serde_json::{json, Value};

/// `GET /health` - liveness only, never touches the event store.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

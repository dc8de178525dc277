//! Liveness endpoint. Does not touch the search backend.

use axum::Json;
use serde_json::{json, Value};

pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "response": "running" }))
}

use super::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// Service descriptor.
pub async fn handle<F, S, R>(State(state): State<AppState<F, S, R>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": state.service_name,
        "endpoints": ["/merge", "/output/<filename>"],
    }))
}

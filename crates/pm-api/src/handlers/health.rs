use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler - GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.config.app.name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

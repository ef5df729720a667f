//! Health endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "rental-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe: verifies database connectivity
pub async fn readiness(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(json!({ "status": "ready" })))
}

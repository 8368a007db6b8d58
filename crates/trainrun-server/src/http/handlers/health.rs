//! Health handler.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::state::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "tracked_jobs": state.registry.len().await,
    }))
}

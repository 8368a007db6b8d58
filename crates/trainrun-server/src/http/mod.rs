//! HTTP server.
//!
//! Provides endpoints for:
//! - Training job submission (`POST /api/train`)
//! - Progress polling (`GET /api/progress?id=..&type=..`)
//! - Health check (`/health`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer for the dashboard
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/train", post(handlers::train))
        .route("/api/progress", get(handlers::get_progress))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

//! Progress polling handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use trainrun_core::{JobId, JobKind};

use crate::http::responses::{ErrorResponse, ProgressParams, ProgressResponse, StalledResponse};
use crate::query::QueryError;
use crate::state::AppState;

/// Report progress for a job.
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProgressParams>,
) -> Response {
    let Some(id) = params.id.filter(|id| !id.is_empty()) else {
        return bad_request("Process ID required");
    };
    let job_id = match JobId::parse(&id) {
        Ok(job_id) => job_id,
        Err(e) => return bad_request(&e.to_string()),
    };
    let Some(kind) = params
        .kind
        .as_deref()
        .and_then(|kind| kind.parse::<JobKind>().ok())
    else {
        return bad_request("Valid type (training/generation) required");
    };

    match state.query.query(&job_id, kind).await {
        Ok(report) => Json(ProgressResponse::from(report)).into_response(),
        Err(QueryError::Stalled { last_progress }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StalledResponse {
                error: "stalled".to_string(),
                last_progress,
            }),
        )
            .into_response(),
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
}

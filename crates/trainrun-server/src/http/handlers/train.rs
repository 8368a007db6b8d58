//! Training submission handler.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};
use trainrun_core::{JobId, JobOutcome, JobRequest};
use trainrun_runner::ProgressSink;

use crate::http::responses::{ErrorResponse, TrainResponse};
use crate::state::AppState;

/// Start a training job and wait for it to finish.
///
/// The response carries the artifacts and final losses on success, or the
/// job's error message with a 500.
pub async fn train(State(state): State<Arc<AppState>>, Json(request): Json<JobRequest>) -> Response {
    let job_id = JobId::generate();
    let sink: Arc<dyn ProgressSink> = state.registry.clone();

    let handle = match state.launcher.launch(job_id.clone(), &request, sink) {
        Ok(handle) => handle,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to launch training job");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response();
        }
    };

    info!(
        job_id = %job_id,
        pid = ?handle.pid(),
        epochs = request.epochs_or_default(),
        batch_size = request.batch_size_or_default(),
        "Training job started"
    );

    match handle.wait().await {
        JobOutcome::Success { artifacts, metrics } => {
            Json(TrainResponse::new(&job_id, artifacts, metrics)).into_response()
        }
        outcome => {
            let message = outcome.error_message().unwrap_or_default();
            warn!(job_id = %job_id, error = %message, "Training job failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(message)),
            )
                .into_response()
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::handlers::test_support::body_json;
    use std::path::PathBuf;
    use trainrun_core::ProgressStatus;
    use trainrun_runner::JobLauncher;

    fn state(script: &str) -> Arc<AppState> {
        let config = Config {
            base_dir: PathBuf::from("/srv/app"),
            ..Config::default()
        };
        let launcher = JobLauncher::new("sh")
            .with_args(["-c", script, "job"])
            .with_paths(config.paths());
        AppState::with_launcher(&config, launcher)
    }

    #[tokio::test]
    async fn test_train_success() {
        let state = state(concat!(
            r#"echo '{"status":"progress","progress":50}';"#,
            r#"echo '{"status":"complete","model_path":"/srv/app/models/m.pth","#,
            r#""history_path":"/srv/app/public/training_history.png","#,
            r#""final_train_loss":0.12,"final_val_loss":0.15}'"#,
        ));

        let response = train(State(state.clone()), Json(JobRequest::default())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["modelPath"], "/srv/app/models/m.pth");
        assert_eq!(body["historyPath"], "/training_history.png");
        assert_eq!(body["trainLoss"], 0.12);
        assert_eq!(body["valLoss"], 0.15);

        let id = JobId::new(body["id"].as_str().unwrap());
        let entry = state.registry.get(&id).await.unwrap();
        assert_eq!(entry.status, ProgressStatus::Complete);
        assert_eq!(entry.percent, 100.0);
    }

    #[tokio::test]
    async fn test_train_reports_classified_error() {
        let state = state("echo 'FileNotFoundError: data/processed' >&2; exit 1");

        let response = train(State(state), Json(JobRequest::default())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Required data files not found. Please ensure processed data exists."
        );
    }

    #[tokio::test]
    async fn test_train_prefixes_unclassified_stderr() {
        let state = state("echo 'Segmentation fault' >&2; exit 1");

        let response = train(State(state), Json(JobRequest::default())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Training process error: Segmentation fault"
        );
    }

    #[tokio::test]
    async fn test_train_reports_exit_code() {
        let state = state("exit 4");

        let response = train(State(state), Json(JobRequest::default())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Process exited with code 4");
    }

    #[tokio::test]
    async fn test_train_launch_failure() {
        let config = Config::default();
        let launcher = JobLauncher::new("/nonexistent/trainrun-python");
        let state = AppState::with_launcher(&config, launcher);

        let response = train(State(state.clone()), Json(JobRequest::default())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].is_string());
        assert!(state.registry.is_empty().await);
    }
}

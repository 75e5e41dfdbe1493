use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::jobs::progress::LogSink;
use crate::models::job::{JobOutcome, JobRequest, JobResult};
use crate::routing::url::TargetUrl;
use crate::routing::Route;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GeneratePayload {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessPayload {
    pub url: Option<String>,
    pub urls: Option<Vec<String>>,
}

impl ProcessPayload {
    /// `urls` wins when it has entries; invalid entries are dropped.
    fn targets(self) -> Vec<TargetUrl> {
        let raw = match self.urls {
            Some(urls) if !urls.is_empty() => urls,
            _ => self.url.into_iter().collect(),
        };
        raw.iter()
            .filter_map(|input| match TargetUrl::parse(input) {
                Ok(target) => Some(target),
                Err(err) => {
                    tracing::info!(error = %err, "skipping invalid url");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct JobQueued {
    pub task_id: Uuid,
    pub status: &'static str,
    pub status_url: String,
}

/// GET /
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "Corpus generation service is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /
///
/// Always runs inside the request. A site root is crawled; a URL naming one
/// page processes only that page.
pub async fn generate_corpus(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePayload>, JsonRejection>,
) -> AppResult<Json<JobResult>> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let raw = payload.url.ok_or(AppError::InvalidUrl)?;
    let target = TargetUrl::parse(&raw)?;
    let request = JobRequest::single(&target);

    match run_inline(&state, &request).await {
        JobOutcome::Completed(result) => Ok(Json(*result)),
        JobOutcome::Failed(failure) => Err(AppError::Internal(failure.error)),
    }
}

/// POST /process
pub async fn process(
    State(state): State<AppState>,
    payload: Result<Json<ProcessPayload>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let targets = payload.targets();
    if targets.is_empty() {
        return Err(AppError::InvalidUrl);
    }

    let response = match state.router().route(targets).await? {
        Route::Inline(request) => Json(run_inline(&state, &request).await).into_response(),
        Route::Background(request) => {
            let task_id = state.workers.submit(request);
            let body = JobQueued {
                task_id,
                status: "processing",
                status_url: state.config.status_url(&task_id.to_string()),
            };
            (StatusCode::ACCEPTED, Json(body)).into_response()
        }
    };
    Ok(response)
}

async fn run_inline(state: &AppState, request: &JobRequest) -> JobOutcome {
    let job_id = Uuid::new_v4();
    tracing::info!(%job_id, url = request.url(), "running job inline");
    state.executor.run(job_id, request, &LogSink { job_id }).await
}

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::jobs::oracle::{self, StatusView};
use crate::state::AppState;

/// GET /status/{job_id}
///
/// Unknown ids are a `NOT_FOUND` state, not an HTTP 404.
pub async fn job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Json<StatusView> {
    let status_url = state.config.status_url(&job_id);
    Json(oracle::job_status(
        &state.jobs,
        state.executor.persister(),
        &job_id,
        status_url,
    ))
}

/// GET /download/{filename}
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let Some(path) = state.executor.persister().resolve(&filename) else {
        return Ok((StatusCode::NOT_FOUND, Json(json!({ "error": "File not found" }))).into_response());
    };

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::Internal(format!("could not read {filename}: {e}")))?;

    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ];
    Ok((headers, bytes).into_response())
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::routing::url::InvalidUrl;

/// Errors surfaced to HTTP callers.
///
/// Classification and execution failures never reach this type: probe
/// failures degrade to "not small" and pipeline failures become a failed
/// job outcome.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid or missing URL in request")]
    InvalidUrl,

    #[error("No URLs found to process for {0}")]
    NoProcessableContent(String),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::InvalidUrl => "invalid_url",
            AppError::NoProcessableContent(_) => "no_processable_content",
            AppError::Internal(_) => "internal",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<InvalidUrl> for AppError {
    fn from(err: InvalidUrl) -> Self {
        tracing::debug!(error = %err, "rejected url");
        AppError::InvalidUrl
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({
            "status": "error",
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

use serde::Serialize;
use uuid::Uuid;

use super::persist::ResultPersister;
use super::store::JobStore;
use crate::models::job::{FailureKind, JobOutcome, JobResult, JobStatus};

const NOT_FOUND_MESSAGE: &str =
    "This task was not found. It may have expired or the provided task ID may be incorrect.";

/// External view of a job at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub state: &'static str,
    pub status: String,
    pub task_id: String,
    pub status_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl StatusView {
    fn new(state: &'static str, status: impl Into<String>, task_id: &str, status_url: String) -> Self {
        Self {
            state,
            status: status.into(),
            task_id: task_id.to_string(),
            status_url,
            message: None,
            url: None,
            progress: None,
            progress_percentage: None,
            result: None,
            error: None,
            error_kind: None,
        }
    }
}

/// `floor(current / total * 100)` clamped to `0..=100`; zero when `total` is 0.
pub fn progress_percentage(current: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    (u64::from(current) * 100 / u64::from(total)).min(100) as u8
}

fn not_found(task_id: &str, status_url: String) -> StatusView {
    let mut view = StatusView::new("NOT_FOUND", "task_not_found", task_id, status_url);
    view.message = Some(NOT_FOUND_MESSAGE.to_string());
    view
}

/// Project whatever is known about `task_id` into a [`StatusView`].
///
/// The live store answers first; a job it no longer holds is looked up among
/// the persisted artifacts. A single read: never waits for the job to move.
pub fn job_status(
    store: &JobStore,
    persister: &ResultPersister,
    task_id: &str,
    status_url: String,
) -> StatusView {
    let Ok(id) = Uuid::parse_str(task_id) else {
        return not_found(task_id, status_url);
    };

    let Some(record) = store.get(&id) else {
        return match persister.load(id) {
            Some(result) => {
                let mut view = StatusView::new("SUCCESS", "completed", task_id, status_url);
                view.result = Some(result);
                view
            }
            None => not_found(task_id, status_url),
        };
    };

    let mut view = StatusView::new(
        record.status.as_str(),
        record.status.as_str().to_lowercase(),
        task_id,
        status_url,
    );

    match (&record.outcome, record.status) {
        (Some(JobOutcome::Completed(result)), _) => {
            view.status = "completed".into();
            view.result = Some(result.as_ref().clone());
        }
        (Some(JobOutcome::Failed(failure)), _) => {
            view.status = "failed".into();
            view.error = Some(failure.error.clone());
            view.error_kind = Some(failure.kind);
            view.url = Some(failure.url.clone());
        }
        (None, JobStatus::Pending) => {
            view.status = "task pending".into();
            view.message = Some("Task is in queue and waiting to be processed.".into());
        }
        (None, JobStatus::Started) => {
            if let Some(progress) = &record.progress {
                view.status = progress.status.clone();
                view.url = Some(progress.url.clone());
                view.progress = Some(format!("{} / {}", progress.current, progress.total));
                view.progress_percentage =
                    Some(progress_percentage(progress.current, progress.total));
            }
        }
        (None, JobStatus::Retry) => {
            view.status = "task retrying".into();
            view.message = Some("Task encountered an issue, It will be retried.".into());
            view.url = Some(record.url.clone());
        }
        (None, JobStatus::Success | JobStatus::Failure) => {
            tracing::warn!(task_id, "terminal job without an outcome");
        }
    }

    view
}

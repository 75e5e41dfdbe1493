use chrono::{DateTime, Utc};
use corpus_service_cli::{CorpusStats, PartialError, QaRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::AppError;
use crate::routing::url::TargetUrl;

pub const TOTAL_STEPS: u32 = 6;

/// Labels reported for steps 1 through 6 of a run.
pub const STEP_LABELS: [&str; TOTAL_STEPS as usize] = [
    "setting up task",
    "initializing models",
    "fetching content",
    "processing content",
    "generating responses",
    "saving results",
];

/// What a job should process. Always holds at least one normalized URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    urls: Vec<String>,
    single_page: bool,
}

impl JobRequest {
    pub fn new(targets: Vec<TargetUrl>, single_page: bool) -> Result<Self, AppError> {
        if targets.is_empty() {
            return Err(AppError::InvalidUrl);
        }
        Ok(Self {
            urls: targets.iter().map(|t| t.as_str().to_string()).collect(),
            single_page,
        })
    }

    pub fn single(target: &TargetUrl) -> Self {
        Self {
            urls: vec![target.as_str().to_string()],
            single_page: target.is_single_page(),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn single_page(&self) -> bool {
        self.single_page
    }

    /// The URL a job is reported and named under.
    pub fn url(&self) -> &str {
        &self.urls[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Started,
    Retry,
    Success,
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Started => "STARTED",
            JobStatus::Retry => "RETRY",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }

    /// Edges of the lifecycle graph. `Started -> Started` carries progress
    /// updates.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Started)
                | (Started, Started)
                | (Started, Retry)
                | (Retry, Started)
                | (Started, Success)
                | (Started, Failure)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressMeta {
    pub current: u32,
    pub total: u32,
    pub status: String,
    pub url: String,
}

impl ProgressMeta {
    pub fn step(step: u32, url: &str) -> Self {
        let current = step.min(TOTAL_STEPS);
        let status = current
            .checked_sub(1)
            .and_then(|i| STEP_LABELS.get(i as usize))
            .copied()
            .unwrap_or("waiting for worker");
        Self {
            current,
            total: TOTAL_STEPS,
            status: status.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub filename: String,
    pub domain: String,
    pub started_at: DateTime<Utc>,
    pub job_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub url: String,
    pub data: Vec<QaRecord>,
    pub errors: Vec<PartialError>,
    pub stats: CorpusStats,
    pub result_url: String,
    pub artifact: OutputArtifact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Pipeline,
    Persistence,
    Timeout,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFailure {
    pub status: &'static str,
    pub kind: FailureKind,
    pub error: String,
    pub url: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, error: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            status: "failed",
            kind,
            error: error.into(),
            url: url.into(),
        }
    }
}

/// Terminal result of one run. Serializes as the bare result or failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobOutcome {
    Completed(Box<JobResult>),
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Success,
            JobOutcome::Failed(_) => JobStatus::Failure,
        }
    }
}

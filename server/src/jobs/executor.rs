use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::future::retry_notify;
use backoff::ExponentialBackoffBuilder;
use chrono::Utc;
use corpus_service_cli::{CorpusOutput, Phase, PipelineError, PipelineObserver};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use super::persist::{PersistError, ResultPersister};
use super::progress::{JobEvent, ProgressSink};
use crate::config::ServerConfig;
use crate::models::job::{FailureKind, JobFailure, JobOutcome, JobRequest, JobResult, ProgressMeta};
use crate::resources::Resources;

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Upper bound on the pipeline call across all attempts.
    pub timeout: Option<Duration>,
}

impl ExecutorSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_retries: config.job_max_retries,
            retry_delay: config.job_retry_delay,
            timeout: config.job_timeout,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("job exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("could not persist result: {0}")]
    Persist(#[from] PersistError),
}

impl ExecutorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutorError::Pipeline(_) => FailureKind::Pipeline,
            ExecutorError::Timeout(_) => FailureKind::Timeout,
            ExecutorError::Persist(_) => FailureKind::Persistence,
        }
    }

    fn is_transient(&self) -> bool {
        matches!(self, ExecutorError::Pipeline(err) if err.is_transient())
    }
}

/// Maps pipeline phases onto executor steps 4 and 5. Step 3 is emitted by
/// the executor itself at the start of every attempt.
struct StepObserver<'a> {
    sink: &'a dyn ProgressSink,
    url: &'a str,
}

impl PipelineObserver for StepObserver<'_> {
    fn phase(&self, phase: Phase) {
        let step = match phase {
            Phase::Fetching => return,
            Phase::Processing => 4,
            Phase::Generating => 5,
        };
        self.sink.emit(JobEvent::Progress(ProgressMeta::step(step, self.url)));
    }
}

/// Runs one job from set-up to persisted result.
///
/// The same executor backs inline requests and background workers, so both
/// paths produce the same outcome shape.
pub struct JobExecutor {
    resources: Resources,
    persister: ResultPersister,
    settings: ExecutorSettings,
}

impl JobExecutor {
    pub fn new(resources: Resources, persister: ResultPersister, settings: ExecutorSettings) -> Self {
        Self {
            resources,
            persister,
            settings,
        }
    }

    pub fn persister(&self) -> &ResultPersister {
        &self.persister
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Never fails: every error is folded into [`JobOutcome::Failed`].
    pub async fn run(&self, job_id: Uuid, request: &JobRequest, sink: &dyn ProgressSink) -> JobOutcome {
        let url = request.url();
        match self.execute(job_id, request, sink).await {
            Ok(result) => {
                tracing::info!(%job_id, %url, qa_pairs = result.stats.qa_pairs, "job completed");
                JobOutcome::Completed(Box::new(result))
            }
            Err(err) => {
                tracing::warn!(%job_id, %url, error = %err, "job failed");
                JobOutcome::Failed(JobFailure::new(err.kind(), err.to_string(), url))
            }
        }
    }

    async fn execute(
        &self,
        job_id: Uuid,
        request: &JobRequest,
        sink: &dyn ProgressSink,
    ) -> Result<JobResult, ExecutorError> {
        let url = request.url();
        let started_at = Utc::now();

        step(sink, 1, url);
        self.persister.prepare()?;
        let artifact = self.persister.artifact(job_id, url, started_at);

        step(sink, 2, url);
        let generation_started = std::time::Instant::now();
        self.resources.pipeline().prepare().await?;

        let mut output = self.generate(request, sink).await?;
        output.stats.generation_time = generation_started.elapsed().as_secs_f64();

        step(sink, 6, url);
        let result = JobResult {
            url: url.to_string(),
            data: output.data,
            errors: output.errors,
            stats: output.stats,
            result_url: self.persister.result_url(&artifact),
            artifact,
        };
        self.persister.write(&result)?;
        Ok(result)
    }

    /// Steps 3 to 5, retried on transient pipeline errors.
    async fn generate(
        &self,
        request: &JobRequest,
        sink: &dyn ProgressSink,
    ) -> Result<CorpusOutput, ExecutorError> {
        let url = request.url();
        let deadline = self.settings.timeout.map(|t| Instant::now() + t);
        let max_retries = self.settings.max_retries;

        let observer = StepObserver { sink, url };
        let observer = &observer;
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.settings.retry_delay)
            .with_max_interval(self.settings.retry_delay * 8)
            .with_max_elapsed_time(None)
            .build();

        retry_notify(
            backoff,
            move || async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                step(sink, 3, url);
                match self.attempt(request, observer, deadline).await {
                    Ok(output) => Ok(output),
                    Err(err) if err.is_transient() && attempt <= max_retries => {
                        Err(backoff::Error::transient(err))
                    }
                    Err(err) => Err(backoff::Error::permanent(err)),
                }
            },
            |err: ExecutorError, delay: Duration| {
                sink.emit(JobEvent::Retrying {
                    attempt: attempts.load(Ordering::SeqCst),
                    error: err.to_string(),
                    delay,
                });
            },
        )
        .await
    }

    async fn attempt(
        &self,
        request: &JobRequest,
        observer: &StepObserver<'_>,
        deadline: Option<Instant>,
    ) -> Result<CorpusOutput, ExecutorError> {
        let run = self
            .resources
            .pipeline()
            .run(request.urls(), request.single_page(), observer);

        let Some(deadline) = deadline else {
            return Ok(run.await?);
        };
        match tokio::time::timeout_at(deadline, run).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ExecutorError::Timeout(self.settings.timeout.unwrap_or_default())),
        }
    }
}

fn step(sink: &dyn ProgressSink, step: u32, url: &str) {
    sink.emit(JobEvent::Progress(ProgressMeta::step(step, url)));
}

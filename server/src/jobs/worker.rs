use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use super::executor::JobExecutor;
use super::progress::StoreSink;
use super::store::JobStore;
use crate::models::job::{FailureKind, JobFailure, JobOutcome, JobRequest, ProgressMeta};

/// Background execution: at most `concurrency` jobs run at once, the rest
/// wait in `PENDING`.
#[derive(Clone)]
pub struct WorkerPool {
    executor: Arc<JobExecutor>,
    store: JobStore,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(executor: Arc<JobExecutor>, store: JobStore, concurrency: usize) -> Self {
        Self {
            executor,
            store,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Record the job as pending and hand it to a worker. Returns at once.
    pub fn submit(&self, request: JobRequest) -> Uuid {
        let job_id = Uuid::new_v4();
        self.store.enqueue(job_id, request.url());
        tracing::info!(%job_id, url = request.url(), urls = request.urls().len(), "job queued");

        let pool = self.clone();
        tokio::spawn(async move { pool.work(job_id, request).await });
        job_id
    }

    async fn work(self, job_id: Uuid, request: JobRequest) {
        let url = request.url().to_string();

        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            self.store.mark_started(job_id, ProgressMeta::step(0, &url));
            self.store.finish(
                job_id,
                JobOutcome::Failed(JobFailure::new(FailureKind::Internal, "worker pool is shut down", url)),
            );
            return;
        };

        let executor = self.executor.clone();
        let sink = StoreSink {
            store: self.store.clone(),
            job_id,
        };
        let handle = tokio::spawn(async move { executor.run(job_id, &request, &sink).await });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(%job_id, error = %err, "job worker crashed");
                let progress = self
                    .store
                    .get(&job_id)
                    .and_then(|record| record.progress)
                    .unwrap_or_else(|| ProgressMeta::step(0, &url));
                self.store.mark_started(job_id, progress);
                JobOutcome::Failed(JobFailure::new(
                    FailureKind::Internal,
                    format!("worker crashed: {err}"),
                    url,
                ))
            }
        };
        self.store.finish(job_id, outcome);
    }
}

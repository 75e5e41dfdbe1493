use std::time::Duration;

use uuid::Uuid;

use super::store::JobStore;
use crate::models::job::ProgressMeta;

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(ProgressMeta),
    Retrying {
        attempt: u32,
        error: String,
        delay: Duration,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

/// Sink for inline runs: nobody polls, so progress only goes to the log.
pub struct LogSink {
    pub job_id: Uuid,
}

impl ProgressSink for LogSink {
    fn emit(&self, event: JobEvent) {
        match event {
            JobEvent::Progress(meta) => tracing::debug!(
                job_id = %self.job_id,
                step = meta.current,
                status = %meta.status,
                url = %meta.url,
                "inline job progress"
            ),
            JobEvent::Retrying { attempt, error, delay } => tracing::info!(
                job_id = %self.job_id,
                attempt,
                ?delay,
                %error,
                "inline job retrying"
            ),
        }
    }
}

/// Sink for background runs: progress lands in the shared job table.
pub struct StoreSink {
    pub store: JobStore,
    pub job_id: Uuid,
}

impl ProgressSink for StoreSink {
    fn emit(&self, event: JobEvent) {
        match event {
            JobEvent::Progress(meta) => {
                self.store.mark_started(self.job_id, meta);
            }
            JobEvent::Retrying { attempt, error, delay } => {
                tracing::info!(job_id = %self.job_id, attempt, ?delay, %error, "job retrying");
                self.store.mark_retry(self.job_id, error);
            }
        }
    }
}

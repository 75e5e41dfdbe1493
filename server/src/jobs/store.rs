use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::job::{JobOutcome, JobStatus, ProgressMeta};

/// What the broker remembers about one job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    pub url: String,
    pub progress: Option<ProgressMeta>,
    pub retry_error: Option<String>,
    pub outcome: Option<JobOutcome>,
    finished_at: Option<Instant>,
}

impl JobRecord {
    fn expired(&self, ttl: Duration) -> bool {
        self.finished_at.is_some_and(|at| at.elapsed() >= ttl)
    }
}

/// Shared job table keyed by job id.
///
/// Workers write, status queries read. Finished jobs are kept for `ttl`;
/// after that only a persisted artifact can answer for them.
#[derive(Clone, Debug)]
pub struct JobStore {
    jobs: Arc<DashMap<Uuid, JobRecord>>,
    ttl: Duration,
}

impl JobStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn enqueue(&self, id: Uuid, url: &str) {
        self.jobs.insert(
            id,
            JobRecord {
                id,
                status: JobStatus::Pending,
                url: url.to_string(),
                progress: None,
                retry_error: None,
                outcome: None,
                finished_at: None,
            },
        );
    }

    pub fn mark_started(&self, id: Uuid, progress: ProgressMeta) -> bool {
        self.transition(id, JobStatus::Started, |record| {
            record.progress = Some(progress);
            record.retry_error = None;
        })
    }

    pub fn mark_retry(&self, id: Uuid, error: String) -> bool {
        self.transition(id, JobStatus::Retry, |record| {
            record.retry_error = Some(error);
        })
    }

    pub fn finish(&self, id: Uuid, outcome: JobOutcome) -> bool {
        let finished = self.transition(id, outcome.status(), |record| {
            record.outcome = Some(outcome);
            record.finished_at = Some(Instant::now());
        });
        self.purge_expired();
        finished
    }

    /// Current record for `id`, or `None` if it never existed or expired.
    pub fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.jobs.remove_if(id, |_, record| record.expired(self.ttl));
        self.jobs.get(id).map(|record| record.value().clone())
    }

    pub fn purge_expired(&self) {
        self.jobs.retain(|_, record| !record.expired(self.ttl));
    }

    fn transition(&self, id: Uuid, next: JobStatus, apply: impl FnOnce(&mut JobRecord)) -> bool {
        let Some(mut record) = self.jobs.get_mut(&id) else {
            tracing::warn!(job_id = %id, next = next.as_str(), "transition for unknown job");
            return false;
        };
        if !record.status.can_transition_to(next) {
            tracing::warn!(
                job_id = %id,
                from = record.status.as_str(),
                to = next.as_str(),
                "rejected illegal job transition"
            );
            return false;
        }
        if record.status != next {
            tracing::debug!(job_id = %id, from = record.status.as_str(), to = next.as_str(), "job transition");
        }
        record.status = next;
        apply(&mut *record);
        true
    }
}

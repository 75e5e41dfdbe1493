use std::sync::Arc;

use crate::config::ServerConfig;
use crate::jobs::executor::{ExecutorSettings, JobExecutor};
use crate::jobs::persist::ResultPersister;
use crate::jobs::store::JobStore;
use crate::jobs::worker::WorkerPool;
use crate::resources::Resources;
use crate::routing::probe::SizeProbe;
use crate::routing::ExecutionRouter;

/// Shared application state handed to every handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// job_id -> record, shared with the worker pool.
    pub jobs: JobStore,
    pub workers: WorkerPool,
    pub executor: Arc<JobExecutor>,
    pub probe: Arc<SizeProbe>,
}

impl AppState {
    pub fn new(config: ServerConfig, resources: Resources) -> Result<Self, reqwest::Error> {
        let probe = SizeProbe::new(
            config.probe_connect_timeout,
            config.probe_read_timeout,
            config.small_website_threshold,
        )?;

        let jobs = JobStore::new(config.result_ttl);
        let persister = ResultPersister::new(config.output_dir.clone(), config.app_url.clone());
        let executor = Arc::new(JobExecutor::new(
            resources,
            persister,
            ExecutorSettings::from_config(&config),
        ));
        let workers = WorkerPool::new(executor.clone(), jobs.clone(), config.worker_concurrency);

        Ok(Self {
            config: Arc::new(config),
            jobs,
            workers,
            executor,
            probe: Arc::new(probe),
        })
    }

    pub fn router(&self) -> ExecutionRouter<'_> {
        ExecutionRouter {
            pipeline: self.executor.resources().pipeline(),
            probe: &self.probe,
            sync_url_threshold: self.config.sync_url_threshold,
        }
    }
}

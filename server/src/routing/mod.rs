pub mod probe;
pub mod url;

use corpus_service_cli::ContentPipeline;

use self::probe::SizeProbe;
use self::url::TargetUrl;
use crate::error::AppError;
use crate::models::job::JobRequest;

/// Where a request should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Cheap enough to run inside the request.
    Inline(JobRequest),
    /// Hand to the worker pool and let the caller poll.
    Background(JobRequest),
}

/// Picks inline or background execution for a set of validated targets.
pub struct ExecutionRouter<'a> {
    pub pipeline: &'a dyn ContentPipeline,
    pub probe: &'a SizeProbe,
    pub sync_url_threshold: usize,
}

impl ExecutionRouter<'_> {
    pub async fn route(&self, targets: Vec<TargetUrl>) -> Result<Route, AppError> {
        // Multi-URL jobs always crawl each target.
        if targets.len() > 1 {
            return Ok(Route::Background(JobRequest::new(targets, false)?));
        }
        let target = targets.first().ok_or(AppError::InvalidUrl)?;
        self.route_single(target).await
    }

    async fn route_single(&self, target: &TargetUrl) -> Result<Route, AppError> {
        let single_page = target.is_single_page();

        let discovered = self
            .pipeline
            .discover(target.as_str(), single_page)
            .await
            .map_err(|err| {
                tracing::warn!(url = %target, error = %err, "discovery failed");
                AppError::Internal(format!("discovery failed for {target}: {err}"))
            })?;
        if discovered.is_empty() {
            return Err(AppError::NoProcessableContent(target.to_string()));
        }

        let request = JobRequest::single(target);
        let count = discovered.len();

        // Only probe when the page count already allows inline execution.
        let inline = single_page
            || (count <= self.sync_url_threshold && self.probe.is_small(target.as_str()).await);

        tracing::info!(url = %target, count, single_page, inline, "routed request");
        Ok(if inline {
            Route::Inline(request)
        } else {
            Route::Background(request)
        })
    }
}

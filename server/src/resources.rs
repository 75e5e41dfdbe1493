use std::sync::Arc;

use corpus_service_cli::{ContentPipeline, CorpusPipeline, PipelineConfig, PipelineError};

/// Generation resources shared by every job in the process.
///
/// Built once at start-up and handed to the executor, so a broken
/// configuration fails the boot instead of the first job.
#[derive(Clone)]
pub struct Resources {
    pipeline: Arc<dyn ContentPipeline>,
}

impl Resources {
    pub fn new(pipeline: Arc<dyn ContentPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let pipeline = CorpusPipeline::new(config)?;
        pipeline.prepare().await?;
        Ok(Self::new(Arc::new(pipeline)))
    }

    pub fn pipeline(&self) -> &dyn ContentPipeline {
        self.pipeline.as_ref()
    }
}

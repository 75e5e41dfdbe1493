pub mod ai;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scraper;
pub mod utils;

use serde::{Deserialize, Serialize};

pub use ai::{Generator, OpenAiGenerator, QaRecord};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{
    ContentPipeline, CorpusOutput, CorpusPipeline, CorpusStats, NoopObserver, PartialError,
    Phase, PipelineObserver,
};
pub use scraper::Scraper;

/// Clean text pulled out of one fetched page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Page {
    pub url: String,
    pub title: String,
    pub meta_description: Option<String>,
    pub elements: Vec<String>,
}

impl Page {
    pub fn new(url: String, title: String) -> Self {
        Self {
            url,
            title,
            meta_description: None,
            elements: Vec::new(),
        }
    }

    pub fn content_length(&self) -> usize {
        self.elements.iter().map(|e| e.len()).sum()
    }

    pub fn truncate_content(&mut self, max_length: usize) {
        let mut current_length = 0;
        self.elements.retain(|e| {
            if current_length + e.len() <= max_length {
                current_length += e.len();
                true
            } else {
                false
            }
        });
    }
}

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::ai::{Generator, OpenAiGenerator, QaRecord};
use crate::config::PipelineConfig;
use crate::scraper::Scraper;
use crate::utils::word_count;
use crate::{Page, PipelineError};

/// Coarse stages of one pipeline run, reported in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Processing,
    Generating,
}

pub trait PipelineObserver: Send + Sync {
    fn phase(&self, phase: Phase);
}

pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn phase(&self, _phase: Phase) {}
}

/// A failure that cost one page or one passage, not the whole run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartialError {
    pub url: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CorpusStats {
    pub pages_discovered: usize,
    pub pages_processed: usize,
    pub elements_extracted: usize,
    pub qa_pairs: usize,
    pub errors: usize,
    /// Seconds spent inside the pipeline.
    pub processing_time: f64,
    /// Seconds from resource initialisation to the end of generation.
    /// Filled in by whoever drives the pipeline.
    pub generation_time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CorpusOutput {
    pub data: Vec<QaRecord>,
    pub errors: Vec<PartialError>,
    pub stats: CorpusStats,
}

/// Everything between "here are some URLs" and "here is the corpus".
#[async_trait]
pub trait ContentPipeline: Send + Sync {
    /// Expand one target into the pages that would be processed for it.
    async fn discover(&self, url: &str, single_page: bool) -> Result<Vec<String>, PipelineError>;

    /// Verify generation resources before a run.
    async fn prepare(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Fetch, process and generate for `urls`.
    async fn run(
        &self,
        urls: &[String],
        single_page: bool,
        observer: &dyn PipelineObserver,
    ) -> Result<CorpusOutput, PipelineError>;
}

pub struct CorpusPipeline {
    scraper: Scraper,
    generator: Arc<dyn Generator>,
    config: PipelineConfig,
}

impl CorpusPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let generator = Arc::new(OpenAiGenerator::new(&config)?);
        Self::with_generator(config, generator)
    }

    pub fn with_generator(
        config: PipelineConfig,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            scraper: Scraper::new(config.clone())?,
            generator,
            config,
        })
    }

    async fn discover_all(
        &self,
        urls: &[String],
        single_page: bool,
        errors: &mut Vec<PartialError>,
    ) -> Result<Vec<String>, PipelineError> {
        let mut targets = Vec::new();
        let mut seen = HashSet::new();
        let mut last_err = None;

        for url in urls {
            match self.scraper.discover(url, single_page).await {
                Ok(found) => {
                    for page in found {
                        if seen.insert(page.clone()) {
                            targets.push(page);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(%url, error = %err, "discovery failed");
                    errors.push(PartialError {
                        url: url.clone(),
                        message: err.to_string(),
                    });
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if targets.is_empty() => Err(err),
            _ => Ok(targets),
        }
    }

    async fn fetch_all(&self, targets: &[String], errors: &mut Vec<PartialError>) -> Vec<Page> {
        let results = stream::iter(targets.iter().cloned())
            .map(|url| async move {
                let result = self.scraper.fetch_page(&url).await;
                (url, result)
            })
            .buffered(self.config.concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        let mut pages = Vec::new();
        for (url, result) in results {
            match result {
                Ok(page) => pages.push(page),
                Err(err) => {
                    tracing::warn!(%url, error = %err, "page skipped");
                    errors.push(PartialError {
                        url: url.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        pages
    }

    /// Passages worth generating from, in page order, without duplicates.
    fn passages(&self, pages: &[Page]) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        pages
            .iter()
            .flat_map(|page| page.elements.iter().map(move |e| (e.clone(), page.url.clone())))
            .filter(|(text, _)| word_count(text) >= self.config.min_words_per_element)
            .filter(|(text, _)| seen.insert(text.clone()))
            .take(self.config.max_sentences)
            .collect()
    }
}

#[async_trait]
impl ContentPipeline for CorpusPipeline {
    async fn discover(&self, url: &str, single_page: bool) -> Result<Vec<String>, PipelineError> {
        self.scraper.discover(url, single_page).await
    }

    async fn prepare(&self) -> Result<(), PipelineError> {
        self.generator.ensure_ready()
    }

    async fn run(
        &self,
        urls: &[String],
        single_page: bool,
        observer: &dyn PipelineObserver,
    ) -> Result<CorpusOutput, PipelineError> {
        let started = Instant::now();
        let label = urls.first().cloned().unwrap_or_default();
        let mut errors = Vec::new();

        observer.phase(Phase::Fetching);
        let targets = self.discover_all(urls, single_page, &mut errors).await?;
        let pages = self.fetch_all(&targets, &mut errors).await;
        if pages.is_empty() {
            return Err(if errors.is_empty() {
                PipelineError::NoContent(label)
            } else {
                PipelineError::Fetch {
                    url: label,
                    reason: "no page could be fetched".into(),
                }
            });
        }

        observer.phase(Phase::Processing);
        let passages = self.passages(&pages);
        if passages.is_empty() {
            return Err(PipelineError::NoContent(label));
        }
        tracing::info!(url = %label, pages = pages.len(), passages = passages.len(), "generating corpus");

        observer.phase(Phase::Generating);
        let generator = &self.generator;
        let results = stream::iter(passages.iter().cloned())
            .map(|(text, page_url)| async move {
                let result = generator.generate(&text, &page_url).await;
                (page_url, result)
            })
            .buffered(self.config.concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        let mut data = Vec::new();
        let mut generation_failures = 0;
        for (page_url, result) in results {
            match result {
                Ok(record) => data.push(record),
                Err(err) => {
                    generation_failures += 1;
                    errors.push(PartialError {
                        url: page_url.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        if data.is_empty() && generation_failures > 0 {
            return Err(PipelineError::Generation(format!(
                "all {generation_failures} passages failed to generate"
            )));
        }

        let stats = CorpusStats {
            pages_discovered: targets.len(),
            pages_processed: pages.len(),
            elements_extracted: passages.len(),
            qa_pairs: data.len(),
            errors: errors.len(),
            processing_time: started.elapsed().as_secs_f64(),
            generation_time: 0.0,
        };

        Ok(CorpusOutput {
            data,
            errors,
            stats,
        })
    }
}

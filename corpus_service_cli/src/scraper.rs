use crate::config::{
    PipelineConfig, CONTENT_TAGS, EXCLUDED_ELEMENTS, EXCLUDED_EXTENSIONS, EXCLUDED_MARKERS,
    EXCLUDED_PATTERNS, USER_AGENT,
};
use crate::utils::clean_text;
use crate::{Page, PipelineError};
use backoff::{future::retry, ExponentialBackoff};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use url::Url;

/// Crawls a site and turns its pages into [`Page`]s.
///
/// One instance is shared by every job; fetched bodies are cached for
/// `cache_ttl` so discovery and extraction of the same page hit the
/// network once.
pub struct Scraper {
    client: Client,
    config: PipelineConfig,
    cache: Mutex<HashMap<String, (Instant, String)>>,
}

impl Scraper {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(config.connect_timeout)
                .timeout(config.connect_timeout + config.request_timeout)
                .build()?,
            config,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Expand `start_url` into the concrete pages worth processing.
    ///
    /// A single page expands to itself without touching the network. A site
    /// is crawled breadth first on the same host, bounded by `max_pages` and
    /// `max_depth`. Failing to load the start page is an error; failing on
    /// any other page only drops that page.
    pub async fn discover(
        &self,
        start_url: &str,
        single_page: bool,
    ) -> Result<Vec<String>, PipelineError> {
        let base_url = Url::parse(start_url).map_err(|e| PipelineError::InvalidUrl {
            url: start_url.to_string(),
            reason: e.to_string(),
        })?;

        if single_page {
            return Ok(vec![start_url.to_string()]);
        }

        let start = base_url.to_string();
        let mut visited = HashSet::from([start.clone()]);
        let mut found = Vec::new();
        let mut frontier = vec![(start.clone(), 0usize)];

        while !frontier.is_empty() && found.len() < self.config.max_pages {
            let take = self.config.concurrent_requests.min(frontier.len());
            let batch: Vec<_> = frontier.drain(..take).collect();

            let results = stream::iter(batch)
                .map(|(url, depth)| async move {
                    let body = self.fetch_with_retry(&url).await;
                    (url, depth, body)
                })
                .buffer_unordered(self.config.concurrent_requests)
                .collect::<Vec<_>>()
                .await;

            for (url, depth, body) in results {
                let body = match body {
                    Ok(body) => body,
                    Err(err) if url == start => return Err(err),
                    Err(err) => {
                        tracing::warn!(%url, error = %err, "skipping page during discovery");
                        continue;
                    }
                };

                if found.len() < self.config.max_pages {
                    found.push(url);
                }
                if depth >= self.config.max_depth {
                    continue;
                }
                for link in extract_links(&base_url, &body) {
                    if visited.insert(link.clone()) {
                        frontier.push((link, depth + 1));
                    }
                }
            }
        }

        tracing::debug!(url = start_url, pages = found.len(), "discovery finished");
        Ok(found)
    }

    /// Fetch and extract one page.
    pub async fn fetch_page(&self, url: &str) -> Result<Page, PipelineError> {
        let body = self.fetch_with_retry(url).await?;
        Ok(extract_page(url, &body, &self.config))
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, PipelineError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..ExponentialBackoff::default()
        };

        retry(backoff, move || async move {
            match self.fetch(url).await {
                Ok(body) => Ok(body),
                Err(e) if e.is_transient() => {
                    tracing::debug!(%url, error = %e, "retrying fetch");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        if let Some(body) = self.cached(url).await {
            return Ok(body);
        }

        tracing::debug!(%url, "fetching");
        tokio::time::sleep(self.config.request_delay).await;

        let res = self.client.get(url).send().await?.error_for_status()?;

        if res
            .content_length()
            .is_some_and(|len| len as usize > self.config.max_content_length)
        {
            return Err(PipelineError::TooLarge {
                url: url.to_string(),
                limit: self.config.max_content_length,
            });
        }

        let body = res.text().await?;
        if body.len() > self.config.max_content_length {
            return Err(PipelineError::TooLarge {
                url: url.to_string(),
                limit: self.config.max_content_length,
            });
        }
        if body.contains("Attention Required!") || body.contains("Checking your browser") {
            return Err(PipelineError::Blocked(url.to_string()));
        }

        if self.config.cache_enabled {
            self.cache
                .lock()
                .await
                .insert(url.to_string(), (Instant::now(), body.clone()));
        }
        Ok(body)
    }

    async fn cached(&self, url: &str) -> Option<String> {
        if !self.config.cache_enabled {
            return None;
        }
        let mut cache = self.cache.lock().await;
        cache.retain(|_, (at, _)| at.elapsed() < self.config.cache_ttl);
        cache.get(url).map(|(_, body)| body.clone())
    }
}

/// Same-host, followable links found in `body`, resolved against `base`.
pub fn extract_links(base: &Url, body: &str) -> Vec<String> {
    let doc = Html::parse_document(body);
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for el in doc.select(&link_selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(mut link) = base.join(href) else {
            continue;
        };
        link.set_fragment(None);
        if !matches!(link.scheme(), "http" | "https") || link.host_str() != base.host_str() {
            continue;
        }
        if is_excluded_path(link.path()) {
            continue;
        }
        let link = link.to_string();
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

fn is_excluded_path(path: &str) -> bool {
    let path = path.to_lowercase();
    EXCLUDED_PATTERNS.iter().any(|p| path.contains(p))
        || EXCLUDED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Pull the title, meta description and readable text elements out of an
/// HTML document. Boilerplate regions (navigation, footers, cookie banners,
/// forms) are skipped, as are containers whose text is already covered by
/// a nested content element.
pub fn extract_page(url: &str, body: &str, config: &PipelineConfig) -> Page {
    let doc = Html::parse_document(body);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| doc.select(&sel).next().map(|el| el.text().collect::<String>()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let mut page = Page::new(url.to_string(), title);

    page.meta_description = Selector::parse("meta[name='description']")
        .ok()
        .and_then(|sel| {
            doc.select(&sel)
                .next()
                .and_then(|meta| meta.value().attr("content").map(str::to_string))
        });

    let Ok(content_selector) = Selector::parse(&CONTENT_TAGS.join(", ")) else {
        return page;
    };

    let mut seen = HashSet::new();
    for el in doc.select(&content_selector) {
        if is_excluded(&el) || el.ancestors().filter_map(ElementRef::wrap).any(|a| is_excluded(&a)) {
            continue;
        }
        if el.select(&content_selector).any(|inner| inner.id() != el.id()) {
            continue;
        }
        let text = clean_text(&el.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() && seen.insert(text.clone()) {
            page.elements.push(text);
        }
    }

    if page.content_length() > config.max_content_length {
        page.truncate_content(config.max_content_length);
    }

    page
}

fn is_excluded(el: &ElementRef<'_>) -> bool {
    let element = el.value();
    if EXCLUDED_ELEMENTS.contains(&element.name()) {
        return true;
    }
    let marked = |token: &str| {
        let token = token.to_lowercase();
        EXCLUDED_MARKERS
            .iter()
            .any(|m| token == *m || token.starts_with(&format!("{m}-")))
    };
    element.classes().any(marked) || element.id().is_some_and(marked)
}

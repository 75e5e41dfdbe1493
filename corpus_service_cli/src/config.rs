use std::time::Duration;

pub const CONTENT_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "article", "section",
];

pub const EXCLUDED_ELEMENTS: &[&str] = &[
    "script", "style", "meta", "noscript", "header", "footer", "nav", "aside", "iframe", "svg",
    "path", "form",
];

pub const EXCLUDED_MARKERS: &[&str] = &[
    "nav", "footer", "header", "sidebar", "menu", "cookie", "popup", "modal",
];

pub const EXCLUDED_PATTERNS: &[&str] = &["login", "signup", "cart", "checkout", "account"];

pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".doc", ".docx", ".xls", ".xlsx", ".zip", ".rar",
    ".exe", ".mp3", ".mp4",
];

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; CorpusBot/1.0)";

/// Limits and credentials for crawling, extraction and generation.
///
/// | Env Var                 | Default                      |
/// |-------------------------|------------------------------|
/// | `MAX_PAGES`             | `20`                         |
/// | `SCRAPING_MAX_DEPTH`    | `5`                          |
/// | `SCRAPING_DELAY_MS`     | `500`                        |
/// | `CONCURRENT_REQUESTS`   | `5`                          |
/// | `MAX_SENTENCES`         | `200`                        |
/// | `MIN_WORDS_PER_ELEMENT` | `3`                          |
/// | `MAX_QUESTION_LENGTH`   | `100`                        |
/// | `MAX_INTENT_LENGTH`     | `30`                         |
/// | `CACHE_ENABLED`         | `true`                       |
/// | `CACHE_TIMEOUT_SECS`    | `3600`                       |
/// | `OPENAI_API_KEY`        | empty                        |
/// | `OPENAI_BASE_URL`       | `https://api.openai.com/v1`  |
/// | `OPENAI_MODEL`          | `gpt-4o-mini`                |
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_pages: usize,
    pub max_depth: usize,
    pub request_delay: Duration,
    pub concurrent_requests: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_content_length: usize,
    pub max_sentences: usize,
    pub min_words_per_element: usize,
    pub max_question_length: usize,
    pub max_intent_length: usize,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            max_depth: 5,
            request_delay: Duration::from_millis(500),
            concurrent_requests: 5,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            max_content_length: 8 * 1024 * 1024,
            max_sentences: 200,
            min_words_per_element: 3,
            max_question_length: 100,
            max_intent_length: 30,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(3600),
            api_key: String::new(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from environment variables, falling back to [`Default`] values
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_pages: env_or("MAX_PAGES", defaults.max_pages),
            max_depth: env_or("SCRAPING_MAX_DEPTH", defaults.max_depth),
            request_delay: Duration::from_millis(env_or(
                "SCRAPING_DELAY_MS",
                defaults.request_delay.as_millis() as u64,
            )),
            concurrent_requests: env_or("CONCURRENT_REQUESTS", defaults.concurrent_requests).max(1),
            connect_timeout: defaults.connect_timeout,
            request_timeout: defaults.request_timeout,
            max_content_length: defaults.max_content_length,
            max_sentences: env_or("MAX_SENTENCES", defaults.max_sentences),
            min_words_per_element: env_or("MIN_WORDS_PER_ELEMENT", defaults.min_words_per_element),
            max_question_length: env_or("MAX_QUESTION_LENGTH", defaults.max_question_length),
            max_intent_length: env_or("MAX_INTENT_LENGTH", defaults.max_intent_length),
            cache_enabled: env_or("CACHE_ENABLED", defaults.cache_enabled),
            cache_ttl: Duration::from_secs(env_or(
                "CACHE_TIMEOUT_SECS",
                defaults.cache_ttl.as_secs(),
            )),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            api_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.api_base_url),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

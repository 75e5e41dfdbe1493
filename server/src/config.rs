use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// | Env Var                       | Default                  |
/// |-------------------------------|--------------------------|
/// | `HOST`                        | `127.0.0.1`              |
/// | `PORT`                        | `3000`                   |
/// | `CLIENT_URL`                  | unset (no CORS layer)    |
/// | `APP_URL`                     | `http://localhost:3000`  |
/// | `OUTPUT_DIRECTORY`            | `download`               |
/// | `SYNC_URL_THRESHOLD`          | `5`                      |
/// | `SMALL_WEBSITE_THRESHOLD`     | `204800`                 |
/// | `PROBE_CONNECT_TIMEOUT_SECS`  | `5`                      |
/// | `PROBE_READ_TIMEOUT_SECS`     | `15`                     |
/// | `WORKER_CONCURRENCY`          | `4`                      |
/// | `JOB_MAX_RETRIES`             | `2`                      |
/// | `JOB_RETRY_DELAY_MS`          | `1000`                   |
/// | `JOB_TIMEOUT_SECS`            | `900` (`0` disables)     |
/// | `RESULT_TTL_SECS`             | `86400`                  |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub client_url: Option<String>,
    /// Public base URL used to build `status_url` and `result_url`.
    pub app_url: String,
    pub output_dir: PathBuf,
    /// Largest discovered page count still eligible for inline execution.
    pub sync_url_threshold: usize,
    /// A probed root strictly smaller than this many bytes counts as small.
    pub small_website_threshold: u64,
    pub probe_connect_timeout: Duration,
    pub probe_read_timeout: Duration,
    pub worker_concurrency: usize,
    pub job_max_retries: u32,
    pub job_retry_delay: Duration,
    pub job_timeout: Option<Duration>,
    /// How long finished jobs stay visible to status queries.
    pub result_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            client_url: None,
            app_url: "http://localhost:3000".into(),
            output_dir: PathBuf::from("download"),
            sync_url_threshold: 5,
            small_website_threshold: 200 * 1024,
            probe_connect_timeout: Duration::from_secs(5),
            probe_read_timeout: Duration::from_secs(15),
            worker_concurrency: 4,
            job_max_retries: 2,
            job_retry_delay: Duration::from_millis(1000),
            job_timeout: Some(Duration::from_secs(900)),
            result_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let job_timeout_secs: u64 = env_or(
            "JOB_TIMEOUT_SECS",
            defaults.job_timeout.map_or(0, |d| d.as_secs()),
        );

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            client_url: std::env::var("CLIENT_URL").ok().filter(|s| !s.trim().is_empty()),
            app_url: std::env::var("APP_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.app_url),
            output_dir: std::env::var("OUTPUT_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            sync_url_threshold: env_or("SYNC_URL_THRESHOLD", defaults.sync_url_threshold),
            small_website_threshold: env_or(
                "SMALL_WEBSITE_THRESHOLD",
                defaults.small_website_threshold,
            ),
            probe_connect_timeout: Duration::from_secs(env_or(
                "PROBE_CONNECT_TIMEOUT_SECS",
                defaults.probe_connect_timeout.as_secs(),
            )),
            probe_read_timeout: Duration::from_secs(env_or(
                "PROBE_READ_TIMEOUT_SECS",
                defaults.probe_read_timeout.as_secs(),
            )),
            worker_concurrency: env_or("WORKER_CONCURRENCY", defaults.worker_concurrency).max(1),
            job_max_retries: env_or("JOB_MAX_RETRIES", defaults.job_max_retries),
            job_retry_delay: Duration::from_millis(env_or(
                "JOB_RETRY_DELAY_MS",
                defaults.job_retry_delay.as_millis() as u64,
            )),
            job_timeout: (job_timeout_secs > 0).then(|| Duration::from_secs(job_timeout_secs)),
            result_ttl: Duration::from_secs(env_or(
                "RESULT_TTL_SECS",
                defaults.result_ttl.as_secs(),
            )),
        }
    }

    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/status/{}", self.app_url, job_id)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

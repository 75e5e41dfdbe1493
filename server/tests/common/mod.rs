#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use corpus_server::config::ServerConfig;
use corpus_server::resources::Resources;
use corpus_server::state::AppState;
use corpus_service_cli::{
    ContentPipeline, CorpusOutput, CorpusStats, Phase, PipelineError, PipelineObserver, QaRecord,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

/// Pipeline double: discovery returns `pages` URLs under the target and a
/// run yields one record per URL.
#[derive(Default)]
pub struct StubPipeline {
    pub pages: usize,
    /// When set, runs park after fetching until notified.
    pub gate: Option<Arc<Notify>>,
    /// This many runs fail with a transient fetch error first.
    pub transient_failures: AtomicU32,
    /// Every run fails with a permanent error.
    pub broken: bool,
    /// Every run panics.
    pub panics: bool,
    pub runs: AtomicU32,
    pub single_page_runs: AtomicU32,
}

impl StubPipeline {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ContentPipeline for StubPipeline {
    async fn discover(&self, url: &str, single_page: bool) -> Result<Vec<String>, PipelineError> {
        let count = if single_page { self.pages.min(1) } else { self.pages };
        Ok((0..count).map(|i| format!("{url}/page-{i}")).collect())
    }

    async fn run(
        &self,
        urls: &[String],
        single_page: bool,
        observer: &dyn PipelineObserver,
    ) -> Result<CorpusOutput, PipelineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if single_page {
            self.single_page_runs.fetch_add(1, Ordering::SeqCst);
        }
        observer.phase(Phase::Fetching);

        let pending = self.transient_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_failures.store(pending - 1, Ordering::SeqCst);
            return Err(PipelineError::Fetch {
                url: urls[0].clone(),
                reason: "connection reset".into(),
            });
        }
        if self.panics {
            panic!("boom");
        }
        if self.broken {
            return Err(PipelineError::NoContent(urls[0].clone()));
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        observer.phase(Phase::Processing);
        observer.phase(Phase::Generating);

        let data: Vec<QaRecord> = urls
            .iter()
            .map(|url| QaRecord {
                question: format!("What is on {url}?"),
                answer: "Fresh bread.".into(),
                intent: "content.bread.baking".into(),
            })
            .collect();
        Ok(CorpusOutput {
            stats: CorpusStats {
                pages_discovered: urls.len(),
                pages_processed: urls.len(),
                qa_pairs: data.len(),
                ..CorpusStats::default()
            },
            data,
            errors: Vec::new(),
        })
    }
}

pub fn test_config(output: &TempDir) -> ServerConfig {
    ServerConfig {
        port: 0,
        output_dir: output.path().to_path_buf(),
        small_website_threshold: 200 * 1024,
        probe_connect_timeout: Duration::from_secs(1),
        probe_read_timeout: Duration::from_secs(2),
        worker_concurrency: 2,
        job_retry_delay: Duration::from_millis(10),
        job_timeout: Some(Duration::from_secs(10)),
        ..ServerConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pipeline: Arc<StubPipeline>,
    pub output: TempDir,
}

pub fn build_test_app(pipeline: StubPipeline) -> TestApp {
    build_test_app_with(pipeline, |_| {})
}

pub fn build_test_app_with(pipeline: StubPipeline, configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let output = tempfile::tempdir().unwrap();
    let mut config = test_config(&output);
    configure(&mut config);

    let pipeline = Arc::new(pipeline);
    let resources = Resources::new(pipeline.clone());
    let state = AppState::new(config, resources).unwrap();
    TestApp {
        router: corpus_server::app(state.clone()),
        state,
        pipeline,
        output,
    }
}

/// A second application over an existing output directory, as after a
/// restart: same artifacts, empty job table.
pub fn build_app_over(output: &TempDir, pipeline: StubPipeline) -> Router {
    let resources = Resources::new(Arc::new(pipeline));
    let state = AppState::new(test_config(output), resources).unwrap();
    corpus_server::app(state)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

pub async fn post_json(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response.into_body()).await)
}

pub async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `/status/{task_id}` until `done` accepts the body or the deadline
/// passes.
pub async fn poll_until(router: &Router, task_id: &str, done: impl Fn(&Value) -> bool) -> Value {
    let uri = format!("/status/{task_id}");
    for _ in 0..200 {
        let (status, body) = get(router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        if done(&body) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {task_id} never reached the expected state");
}

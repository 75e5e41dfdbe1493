use std::sync::Mutex;
use std::time::Duration;

use corpus_service_cli::{
    ContentPipeline, CorpusPipeline, Phase, PipelineConfig, PipelineError, PipelineObserver,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingObserver {
    phases: Mutex<Vec<Phase>>,
}

impl PipelineObserver for RecordingObserver {
    fn phase(&self, phase: Phase) {
        self.phases.lock().unwrap().push(phase);
    }
}

fn test_config(server: &MockServer) -> PipelineConfig {
    PipelineConfig {
        request_delay: Duration::ZERO,
        api_key: "test-key".into(),
        api_base_url: server.uri(),
        ..PipelineConfig::default()
    }
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><title>Home</title></head><body>
                 <nav><p>Home about contact links</p></nav>
                 <p>We bake fresh bread every single morning.</p>
                 <a href="/about">About</a>
                 <a href="/login">Login</a>
               </body></html>"#,
            "text/html",
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><title>About</title></head><body>
                 <p>Our bakery was founded in 1990 by two friends.</p>
               </body></html>"#,
            "text/html",
        ))
        .mount(server)
        .await;
}

async fn mount_completions(server: &MockServer, status: u16) {
    let content = json!({
        "answer": "Fresh bread is baked every morning.",
        "question": "When is the bread baked",
        "topic": "bread",
        "subject": "baking"
    })
    .to_string();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn crawls_site_and_generates_a_record_per_passage() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_completions(&server, 200).await;

    let pipeline = CorpusPipeline::new(test_config(&server)).expect("pipeline");
    let observer = RecordingObserver::default();

    let output = pipeline
        .run(&[format!("{}/", server.uri())], false, &observer)
        .await
        .expect("run ok");

    assert_eq!(output.stats.pages_discovered, 2);
    assert_eq!(output.stats.pages_processed, 2);
    assert_eq!(output.data.len(), 2);
    assert_eq!(output.stats.qa_pairs, 2);
    assert!(output.errors.is_empty());
    assert_eq!(output.data[0].question, "When is the bread baked?");
    assert_eq!(output.data[0].intent, "content.bread.baking");
    assert_eq!(output.data[1].intent, "about.bread.baking");
    assert_eq!(
        *observer.phases.lock().unwrap(),
        vec![Phase::Fetching, Phase::Processing, Phase::Generating]
    );
}

#[tokio::test]
async fn single_page_discovery_does_not_crawl() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let pipeline = CorpusPipeline::new(test_config(&server)).expect("pipeline");
    let url = format!("{}/about", server.uri());

    let urls = pipeline.discover(&url, true).await.expect("discover");

    assert_eq!(urls, vec![url]);
}

#[tokio::test]
async fn generation_outage_fails_the_run() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_completions(&server, 400).await;

    let pipeline = CorpusPipeline::new(test_config(&server)).expect("pipeline");

    let err = pipeline
        .run(&[format!("{}/about", server.uri())], true, &RecordingObserver::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Generation(_)));
}

#[tokio::test]
async fn unreachable_page_is_a_transient_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let pipeline = CorpusPipeline::new(test_config(&server)).expect("pipeline");

    let err = pipeline
        .run(&[format!("{}/gone", server.uri())], true, &RecordingObserver::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Fetch { .. }));
    assert!(err.is_transient());
}

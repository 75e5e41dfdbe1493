mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{
    build_app_over, build_test_app, build_test_app_with, get, poll_until, post_json, StubPipeline,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Notify;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn site_of_size(bytes: usize) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(bytes)))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn health_reports_online() {
    let app = build_test_app(StubPipeline::with_pages(1));
    let (status, body) = get(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
}

#[tokio::test]
async fn small_site_is_processed_inline() {
    let site = site_of_size(50 * 1024).await;
    let app = build_test_app(StubPipeline::with_pages(1));

    let payload = json!({ "url": site.uri() }).to_string();
    let (status, body) = post_json(&app.router, "/process", &payload).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("task_id").is_none());
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["stats"]["qa_pairs"], 1);

    let filename = body["artifact"]["filename"].as_str().unwrap();
    assert!(filename.starts_with("127.0.0.1-"));
    assert!(app.output.path().join(filename).is_file());
    assert_eq!(
        body["result_url"],
        format!("http://localhost:3000/download/{filename}")
    );
}

#[tokio::test]
async fn large_site_is_queued() {
    let site = site_of_size(300 * 1024).await;
    let app = build_test_app(StubPipeline::with_pages(1));

    let payload = json!({ "url": site.uri() }).to_string();
    let (status, body) = post_json(&app.router, "/process", &payload).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "processing");
    let task_id = body["task_id"].as_str().unwrap();
    assert_eq!(
        body["status_url"],
        format!("http://localhost:3000/status/{task_id}")
    );
}

#[tokio::test]
async fn many_pages_skip_the_probe_and_queue() {
    let app = build_test_app_with(StubPipeline::with_pages(6), |config| config.sync_url_threshold = 5);

    // Unroutable: the probe would fail, but it must not even be tried.
    let (status, body) = post_json(&app.router, "/process", r#"{"url":"http://127.0.0.1:1"}"#).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "processing");
}

#[tokio::test]
async fn single_page_runs_inline_without_probe() {
    let app = build_test_app(StubPipeline::with_pages(3));

    let (status, body) = post_json(&app.router, "/process", r#"{"url":"http://127.0.0.1:1/about"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "http://127.0.0.1:1/about");
    assert!(body.get("task_id").is_none());
}

#[tokio::test]
async fn url_list_is_filtered_and_runs_in_background() {
    let app = build_test_app(StubPipeline::with_pages(1));

    let payload = r#"{"urls":["example.com","example.org","bad::url"]}"#;
    let (status, body) = post_json(&app.router, "/process", payload).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "processing");
    let task_id = body["task_id"].as_str().unwrap().to_string();

    let done = poll_until(&app.router, &task_id, |b| b["state"] == "SUCCESS").await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["task_id"], task_id.as_str());
    assert_eq!(done["result"]["url"], "https://example.com");
    assert_eq!(done["result"]["data"].as_array().unwrap().len(), 2);

    let filename = done["result"]["artifact"]["filename"].as_str().unwrap();
    assert_eq!(filename, format!("example.com-{task_id}.json"));
}

#[tokio::test]
async fn progress_is_visible_while_running() {
    let gate = Arc::new(Notify::new());
    let app = build_test_app(StubPipeline {
        pages: 1,
        gate: Some(gate.clone()),
        ..StubPipeline::default()
    });

    let payload = r#"{"urls":["example.com","example.org"]}"#;
    let (_, body) = post_json(&app.router, "/process", payload).await;
    let task_id = body["task_id"].as_str().unwrap().to_string();

    let running = poll_until(&app.router, &task_id, |b| b["progress"] == "3 / 6").await;
    assert_eq!(running["state"], "STARTED");
    assert_eq!(running["status"], "fetching content");
    assert_eq!(running["progress_percentage"], 50);
    assert_eq!(running["url"], "https://example.com");

    gate.notify_one();
    let done = poll_until(&app.router, &task_id, |b| b["state"] == "SUCCESS").await;
    assert!(done.get("progress").is_none());
}

#[tokio::test]
async fn failed_background_job_reports_failure() {
    let app = build_test_app(StubPipeline {
        pages: 1,
        broken: true,
        ..StubPipeline::default()
    });

    let payload = r#"{"urls":["example.com","example.org"]}"#;
    let (_, body) = post_json(&app.router, "/process", payload).await;
    let task_id = body["task_id"].as_str().unwrap().to_string();

    let failed = poll_until(&app.router, &task_id, |b| b["state"] == "FAILURE").await;
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["error_kind"], "pipeline");
    assert!(failed["error"].as_str().unwrap().contains("example.com"));
}

#[tokio::test]
async fn unknown_task_is_not_found_and_stays_so() {
    let app = build_test_app(StubPipeline::with_pages(1));

    let (status, first) = get(&app.router, "/status/no-such-task").await;
    let (_, second) = get(&app.router, "/status/no-such-task").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["state"], "NOT_FOUND");
    assert_eq!(first["status"], "task_not_found");
    assert_eq!(first["task_id"], "no-such-task");
    assert_eq!(first, second);
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let app = build_test_app(StubPipeline::with_pages(1));

    let (status, body) = post_json(&app.router, "/process", r#"{"url":"bad::url"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "invalid_url");

    let (status, body) = post_json(&app.router, "/process", r#"{"urls":["bad::url", ""]}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_url");

    let (status, body) = post_json(&app.router, "/", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_url");

    let (status, body) = post_json(&app.router, "/process", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn empty_discovery_is_a_client_error() {
    let app = build_test_app(StubPipeline::with_pages(0));

    let (status, body) = post_json(&app.router, "/process", r#"{"url":"example.com"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "no_processable_content");
}

#[tokio::test]
async fn generate_runs_inline_and_surfaces_failures_as_500() {
    let app = build_test_app(StubPipeline::with_pages(1));
    let (status, body) = post_json(&app.router, "/", r#"{"url":"example.com"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://example.com");

    let broken = build_test_app(StubPipeline {
        pages: 1,
        broken: true,
        ..StubPipeline::default()
    });
    let (status, body) = post_json(&broken.router, "/", r#"{"url":"example.com"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("example.com"));
}

#[tokio::test]
async fn persisted_results_can_be_downloaded() {
    let app = build_test_app(StubPipeline::with_pages(1));
    let (_, body) = post_json(&app.router, "/", r#"{"url":"www.example.com"}"#).await;
    let filename = body["artifact"]["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("example.com-"));

    let request = Request::builder()
        .uri(format!("/download/{filename}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

    let downloaded = common::body_json(response.into_body()).await;
    assert_eq!(downloaded["url"], "https://www.example.com");

    let (status, body) = get(&app.router, "/download/missing.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "File not found" }));
}

#[tokio::test]
async fn unknown_routes_and_methods_get_json_errors() {
    let app = build_test_app(StubPipeline::with_pages(1));

    let (status, body) = get(&app.router, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");

    let request = Request::builder()
        .method("DELETE")
        .uri("/process")
        .body(Body::empty())
        .unwrap();
    let (status, body) = common::send(&app.router, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], "Method not allowed for this endpoint");
}

#[tokio::test]
async fn finished_jobs_are_found_again_after_a_restart() {
    let app = build_test_app(StubPipeline::with_pages(1));

    let payload = r#"{"urls":["example.com","example.org"]}"#;
    let (_, body) = post_json(&app.router, "/process", payload).await;
    let task_id = body["task_id"].as_str().unwrap().to_string();
    let before = poll_until(&app.router, &task_id, |b| b["state"] == "SUCCESS").await;

    let restarted = build_app_over(&app.output, StubPipeline::with_pages(1));
    let (status, after) = get(&restarted, &format!("/status/{task_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["state"], "SUCCESS");
    assert_eq!(after["status"], "completed");
    assert_eq!(after["task_id"], task_id.as_str());
    assert_eq!(after["result"], before["result"]);
}

#[tokio::test]
async fn generate_processes_one_page_when_given_a_page_url() {
    let app = build_test_app(StubPipeline::with_pages(3));

    let (status, _) = post_json(&app.router, "/", r#"{"url":"example.com/about"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.pipeline.single_page_runs.load(Ordering::SeqCst), 1);

    let (status, _) = post_json(&app.router, "/", r#"{"url":"example.com"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.pipeline.single_page_runs.load(Ordering::SeqCst), 1);
    assert_eq!(app.pipeline.runs.load(Ordering::SeqCst), 2);
}

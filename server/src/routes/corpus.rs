use axum::routing::{get, post};
use axum::Router;

use crate::handlers::corpus_handlers::{generate_corpus, health, process};
use crate::handlers::job_handlers::{download_file, job_status};
use crate::state::AppState;

pub fn corpus_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(health).post(generate_corpus))
        .route("/process", post(process))
        .route("/status/{job_id}", get(job_status))
        .route("/download/{filename}", get(download_file))
        .with_state(state)
}

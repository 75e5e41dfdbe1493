pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod resources;
pub mod routes;
pub mod routing;
pub mod state;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use routes::corpus::corpus_routes;
use state::AppState;

/// Full application router, shared by `main` and the integration tests.
pub fn app(state: AppState) -> Router {
    let cors = state.config.client_url.as_deref().and_then(cors_layer);

    let router = Router::new()
        .merge(corpus_routes(state))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(client_url: &str) -> Option<CorsLayer> {
    match client_url.parse::<HeaderValue>() {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        ),
        Err(err) => {
            tracing::warn!(%client_url, error = %err, "ignoring invalid CLIENT_URL");
            None
        }
    }
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "error", "message": "Route not found" })),
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "status": "error", "message": "Method not allowed for this endpoint" })),
    )
}

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use corpus_server::config::ServerConfig;
use corpus_server::resources::Resources;
use corpus_server::state::AppState;
use corpus_service_cli::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("corpus_server=debug,corpus_service_cli=info,tower_http=info")
            }),
        )
        .init();

    let config = ServerConfig::from_env();
    let resources = Resources::from_config(PipelineConfig::from_env())
        .await
        .context("failed to initialize generation resources")?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, resources).context("failed to build http client")?;
    let app = corpus_server::app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

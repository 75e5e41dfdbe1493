use std::path::PathBuf;

use clap::Parser;
use corpus_service_cli::{utils, ContentPipeline, CorpusPipeline, NoopObserver, PipelineConfig};
use dotenv::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to turn into a corpus
    #[arg(short, long)]
    url: String,

    /// Only process the given page instead of crawling the site
    #[arg(short, long)]
    single_page: bool,

    /// Maximum number of pages to crawl
    #[arg(short, long)]
    max_pages: Option<usize>,

    /// Where to write the corpus
    #[arg(short, long, default_value = "result.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_service_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }

    let pipeline = CorpusPipeline::new(config)?;
    pipeline.prepare().await?;

    let output = pipeline
        .run(&[args.url.clone()], args.single_page, &NoopObserver)
        .await?;

    if output.data.is_empty() {
        tracing::warn!(url = %args.url, "no question/answer pairs were generated");
    }

    utils::save_json(&output, &args.output)?;
    Ok(())
}

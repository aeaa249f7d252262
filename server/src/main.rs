use anyhow::Result;
use axum::Router;
use clap::Parser;
use sitesearch_server::build_app;
use sitesearch_core::{EngineConfig, SearchEngine, DEFAULT_MIN_TEXT_LEN};
use sitesearch_crawler::{crawl, CrawlConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// Crawl a site into an in-memory index, then serve keyword queries over it.
#[derive(Parser)]
#[command(name = "sitesearch")]
struct Args {
    #[command(flatten)]
    crawl: CrawlConfig,
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    /// Comma separated origins for CORS; any origin when unset
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    cors_allow_origin: Option<String>,
    /// Pages with this many bytes of text or fewer are not indexed
    #[arg(long, env = "MIN_TEXT_LEN", default_value_t = DEFAULT_MIN_TEXT_LEN)]
    min_text_len: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let engine = Arc::new(SearchEngine::new(EngineConfig { min_text_len: args.min_text_len }));
    let summary = crawl(&args.crawl, Arc::clone(&engine)).await?;
    let stats = engine.stats();
    tracing::info!(
        documents = stats.documents,
        tokens = stats.tokens,
        indexed = summary.pages_indexed,
        elapsed_s = summary.elapsed.as_secs_f64(),
        "done crawling, ready to process queries"
    );

    let app: Router = build_app(engine, args.cors_allow_origin.as_deref());
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

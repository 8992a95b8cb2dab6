use anyhow::Result;
use axum::Router;
use clap::Parser;
use lexitree_core::corpus::load_corpus;
use lexitree_server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Corpus file (.json or .jsonl) indexed at startup
    #[arg(long)]
    corpus: Option<String>,
    /// B-tree minimum degree
    #[arg(long, default_value_t = 3)]
    min_degree: usize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let corpus = match &args.corpus {
        Some(path) => load_corpus(path)?,
        None => Vec::new(),
    };
    let app: Router = build_app(corpus, args.min_degree)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

use anyhow::Result;
use axum::Router;
use clap::Parser;
use ranker_core::persist::IndexPaths;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Dictionary file written by the indexer
    #[arg(short = 'd', long, default_value = "./dictionary.json")]
    dictionary: PathBuf,
    /// Postings file written by the indexer
    #[arg(short = 'p', long, default_value = "./postings.txt")]
    postings: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Log elapsed time per query
    #[arg(long, default_value_t = false)]
    timing: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app: Router = build_app(&IndexPaths::new(&args.dictionary, &args.postings), args.timing)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

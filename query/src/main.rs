use anyhow::{Context, Result};
use clap::Parser;
use ranker_core::engine::{QueryConfig, QueryEngine};
use ranker_core::persist::IndexPaths;
use ranker_core::topk::DEFAULT_K;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Rank documents for a file of free-text queries", long_about = None)]
struct Args {
    /// Dictionary file written by the indexer
    #[arg(short = 'd', long)]
    dictionary: PathBuf,
    /// Postings file written by the indexer
    #[arg(short = 'p', long)]
    postings: PathBuf,
    /// Queries, one per line
    #[arg(short = 'q', long)]
    queries: PathBuf,
    /// Output file, one line of ranked document ids per query
    #[arg(short = 'o', long)]
    output: PathBuf,
    /// Number of documents to return per query
    #[arg(short = 'k', long, default_value_t = DEFAULT_K)]
    top_k: usize,
    /// Log elapsed time per query and for the whole batch
    #[arg(long, default_value_t = false)]
    timing: bool,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let paths = IndexPaths::new(&args.dictionary, &args.postings);
    let config = QueryConfig { top_k: args.top_k, timing: args.timing };
    let mut engine = QueryEngine::open(&paths, config)
        .with_context(|| format!("loading index {}", args.dictionary.display()))?;

    let queries = File::open(&args.queries).with_context(|| format!("opening {}", args.queries.display()))?;
    let output = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    let summary = engine.run_batch(BufReader::new(queries), BufWriter::new(output))?;
    tracing::info!(queries = summary.queries, failed = summary.failed, output = %args.output.display(), "queries answered");
    Ok(())
}

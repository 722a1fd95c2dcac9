use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ranker_core::build::{build_index, BuildConfig};
use ranker_core::persist::{IndexPaths, PostingsEncoding};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a vector-space postings index from a document directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every document in a directory whose file names are numeric document ids
    Build {
        /// Directory of documents
        #[arg(short = 'i', long)]
        input: PathBuf,
        /// Output dictionary (JSON metadata) file
        #[arg(short = 'd', long)]
        dictionary: PathBuf,
        /// Output postings file
        #[arg(short = 'p', long)]
        postings: PathBuf,
        /// Postings encoding: text or binary
        #[arg(long, default_value_t = PostingsEncoding::Text)]
        encoding: PostingsEncoding,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, dictionary, postings, encoding } => {
            let start = Instant::now();
            let paths = IndexPaths::new(&dictionary, &postings);
            let summary = build_index(&input, &paths, &BuildConfig { encoding })
                .with_context(|| format!("building index from {}", input.display()))?;
            tracing::info!(
                num_docs = summary.num_docs,
                num_terms = summary.num_terms,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "done"
            );
            Ok(())
        }
    }
}

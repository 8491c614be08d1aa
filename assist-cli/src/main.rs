//! # assist CLI
//!
//! Ingest PDF, DOCX and text files into a knowledge base and search them.
//! The index is kept in a JSON snapshot between invocations.
//!
//! ```bash
//! # Add files
//! assist ingest notes/meeting.docx reports/q3.pdf
//!
//! # Ask for the three closest documents
//! assist search "what was decided about the budget"
//!
//! # JSON output, five results
//! assist --format json search "budget" -k 5
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use assist_rag::{EmbeddingProvider, HashingEmbedder};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{OutputFormat, Render};

#[derive(Parser, Debug)]
#[command(name = "assist")]
#[command(about = "Ingest documents and search them by similarity")]
#[command(version)]
struct Cli {
    /// Snapshot file holding the index
    #[arg(long, global = true, env = "ASSIST_INDEX", default_value = "assist-index.json")]
    index: PathBuf,

    /// Embedding model used for ingestion and search.
    ///
    /// `hashing` matches on shared words only, so a query finds documents
    /// that use its vocabulary, not its meaning ("feline" will not find
    /// "cats"). Build with `--features candle` and pass `minilm` for semantic
    /// search. An index must be searched with the embedder that built it.
    #[arg(
        long,
        global = true,
        env = "ASSIST_EMBEDDER",
        value_enum,
        default_value_t = EmbedderKind::Hashing
    )]
    embedder: EmbedderKind,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and index one or more files
    Ingest {
        /// Files to ingest (.pdf, .docx, .txt)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Return the documents closest to a query
    Search {
        /// Natural-language query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },

    /// Show index statistics
    Stats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Lexical: deterministic bag-of-words feature hashing, no model download
    Hashing,
    /// Semantic: sentence-transformers/all-MiniLM-L6-v2 via Candle (needs the `candle` feature)
    Minilm,
}

impl EmbedderKind {
    fn provider(self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self {
            Self::Hashing => Ok(Arc::new(HashingEmbedder::default())),
            #[cfg(feature = "candle")]
            Self::Minilm => Ok(Arc::new(assist_rag::MiniLmEmbedder::new())),
            #[cfg(not(feature = "candle"))]
            Self::Minilm => bail!("the minilm embedder requires building with `--features candle`"),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let kb = commands::open(&cli.index, cli.embedder.provider()?).await?;

    match cli.command {
        Command::Ingest { files } => {
            let report = commands::ingest(&kb, &cli.index, &files).await?;
            println!("{}", report.render(cli.format)?);
            if !report.failed.is_empty() {
                bail!("{} of {} file(s) could not be ingested", report.failed.len(), files.len());
            }
        }
        Command::Search { query, top_k } => {
            let report = commands::search(&kb, &query, top_k).await?;
            println!("{}", report.render(cli.format)?);
        }
        Command::Stats => {
            let report = commands::stats(&kb, &cli.index).await;
            println!("{}", report.render(cli.format)?);
        }
    }

    Ok(())
}

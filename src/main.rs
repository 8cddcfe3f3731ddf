//! # docqa CLI
//!
//! The `docqa` binary serves the HTTP API and drives both pipelines
//! directly from the command line.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa serve` | Start the HTTP server (`/query`, `/add-data`, `/health-check`) |
//! | `docqa ingest <path>` | Ingest one file into the vector index |
//! | `docqa query "<text>"` | Answer a question against the indexed corpus |
//! | `docqa health` | Probe the vector index and embedding provider |
//!
//! Credentials are read from the environment (`OPENAI_API_KEY`,
//! `PINECONE_API_KEY`), optionally via a `.env` file in the working
//! directory.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docqa::config::{load_config, Config, ConfigError};
use docqa::embedding::{EmbeddingClient, OpenAiEmbeddings};
use docqa::generation::{GenerationClient, OpenAiChat};
use docqa::index::{PineconeIndex, VectorIndex};
use docqa::ingest::IngestPipeline;
use docqa::query::QueryPipeline;
use docqa::server::{run_server, AppState};

/// docqa — retrieval-augmented question answering over your own documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Retrieval-augmented question answering over your own documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves `/query`, `/add-data`, and
    /// `/health-check` until the process is terminated.
    Serve,

    /// Ingest one file into the vector index.
    ///
    /// Supports PDF, plain text, markdown, and images (OCR). The file is
    /// extracted, chunked, embedded, and upserted synchronously.
    Ingest {
        /// Path to the file to ingest.
        path: PathBuf,
    },

    /// Answer a question against the indexed corpus.
    Query {
        /// The question to answer.
        text: String,
    },

    /// Probe connectivity to the vector index and embedding provider.
    Health,
}

/// Construct the long-lived client handles and pipelines. A missing
/// credential or unusable setting fails here, before anything serves.
fn build_state(config: &Config) -> Result<AppState, ConfigError> {
    let embedder: Arc<dyn EmbeddingClient> = Arc::new(OpenAiEmbeddings::new(&config.embedding)?);
    let index: Arc<dyn VectorIndex> = Arc::new(PineconeIndex::new(&config.index)?);
    let generator: Arc<dyn GenerationClient> = Arc::new(OpenAiChat::new(&config.generation)?);

    let ingest = Arc::new(IngestPipeline::new(
        embedder.clone(),
        index.clone(),
        config.chunking.clone(),
    ));
    let query = Arc::new(QueryPipeline::new(
        embedder.clone(),
        index.clone(),
        generator,
        config.generation.clone(),
    ));

    Ok(AppState {
        ingest,
        query,
        embedder,
        index,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let state = build_state(&config)?;

    match cli.command {
        Commands::Serve => run_server(&config, state).await,
        Commands::Ingest { path } => {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("path has no usable file name")?
                .to_string();
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let report = state.ingest.ingest(&filename, &bytes).await?;
            println!("ingest {}", report.file);
            println!("  chunks indexed: {}", report.chunks_indexed);
            println!("ok");
            Ok(())
        }
        Commands::Query { text } => {
            let response = state.query.answer(&text).await?;
            println!("{}", response.response);
            Ok(())
        }
        Commands::Health => {
            state
                .index
                .describe()
                .await
                .context("vector index unreachable")?;
            state
                .embedder
                .embed("health check")
                .await
                .context("embedding provider unreachable")?;
            println!("healthy");
            Ok(())
        }
    }
}

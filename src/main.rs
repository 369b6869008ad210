//! # askdocs CLI
//!
//! The `askdocs` binary drives the document pipeline: start the HTTP server,
//! or run ingestion, listing, deletion, and question answering directly from
//! the command line against the same configuration.
//!
//! ## Usage
//!
//! ```bash
//! askdocs --config ./config/askdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs serve` | Start the HTTP server |
//! | `askdocs process <files...>` | Extract, chunk, and index stored files |
//! | `askdocs list` | List stored files with index membership |
//! | `askdocs ask "<question>"` | Answer a question from uploaded documents |
//! | `askdocs delete <file>` | Remove a document's chunks and blob |
//!
//! ## Examples
//!
//! ```bash
//! # Start the server
//! askdocs serve --config ./config/askdocs.toml
//!
//! # Index two files already in the storage directory
//! askdocs process report.pdf notes.txt
//!
//! # Ask a question over everything indexed from uploads
//! askdocs ask "what were the Q3 action items?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use askdocs::config::{self, Config};
use askdocs::delete::{delete_document, DeletionOutcome};
use askdocs::embedding::create_provider;
use askdocs::index::{create_index, VectorIndex};
use askdocs::ingest::process_files;
use askdocs::rag::{answer, create_chat};
use askdocs::retrieve::list_documents;
use askdocs::server::run_server;
use askdocs::storage::BlobStore;

/// askdocs — upload, index, and ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/askdocs.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "askdocs — upload, index, and ask questions about your documents",
    version,
    long_about = "askdocs stores uploaded documents, extracts their text (PDF, DOCX, PPTX, \
    XLSX, plain text), chunks and embeds it into a vector index, and answers questions \
    grounded in the uploaded content via a CLI and a JSON HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/askdocs.toml`. Storage, chunking, index,
    /// embedding, generation, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// document upload, processing, and question-answering endpoints.
    Serve,

    /// Extract, chunk, and index stored files.
    ///
    /// Each named file must already exist in the storage directory. Files
    /// are processed independently; one failure never aborts the rest.
    Process {
        /// Filenames to process (as stored, e.g. `report.pdf`).
        files: Vec<String>,
    },

    /// List stored files with index membership.
    List,

    /// Answer a question from the uploaded documents.
    ///
    /// Retrieves the most relevant chunks, assembles a prompt, and prints
    /// the generated answer. Requires `[generation]` to be configured.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Remove a document's indexed chunks and its stored file.
    Delete {
        /// Filename to delete (as stored).
        filename: String,
    },
}

/// Wire up the blob store and vector index from config.
async fn open_pipeline(cfg: &Config) -> anyhow::Result<(Arc<BlobStore>, Arc<dyn VectorIndex>)> {
    let store = Arc::new(BlobStore::new(&cfg.storage.root)?);
    let embedder = if cfg.embedding.is_enabled() {
        Some(create_provider(&cfg.embedding)?)
    } else {
        None
    };
    let index = create_index(&cfg.index, embedder).await?;
    Ok((store, index))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("askdocs=info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            run_server(&cfg).await?;
        }
        Commands::Process { files } => {
            if files.is_empty() {
                anyhow::bail!("no filenames given");
            }
            let (store, index) = open_pipeline(&cfg).await?;
            let report = process_files(&store, index.as_ref(), &cfg.chunking, &files).await;
            for name in report.processed_files() {
                println!("processed: {}", name);
            }
            for label in report.failed_files() {
                println!("failed: {}", label);
            }
            println!("chunks added: {}", report.total_chunks_added);
            if report.is_partial() {
                std::process::exit(1);
            }
        }
        Commands::List => {
            let (store, index) = open_pipeline(&cfg).await?;
            let docs = list_documents(&store, index.as_ref(), cfg.retrieval.probe_limit).await?;
            if docs.is_empty() {
                println!("No documents stored.");
            }
            for doc in docs {
                println!(
                    "{}\t{} bytes\t{}\t{}",
                    doc.filename,
                    doc.size_bytes,
                    doc.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
                    if doc.in_index { "indexed" } else { "not indexed" }
                );
            }
        }
        Commands::Ask { question } => {
            let (_store, index) = open_pipeline(&cfg).await?;
            let chat = create_chat(&cfg.generation)?;
            let reply = answer(
                index.as_ref(),
                chat.as_ref(),
                &question,
                &cfg.retrieval,
                &cfg.generation,
            )
            .await?;
            println!("{}", reply);
        }
        Commands::Delete { filename } => {
            let (store, index) = open_pipeline(&cfg).await?;
            match delete_document(&store, index.as_ref(), &filename, cfg.retrieval.scan_cap).await?
            {
                DeletionOutcome::NotFoundInIndex => {
                    println!("no indexed chunks for {}", filename);
                    std::process::exit(1);
                }
                DeletionOutcome::Deleted {
                    chunks_deleted,
                    blob_deleted,
                } => {
                    println!(
                        "deleted {} chunks for {}{}",
                        chunks_deleted,
                        filename,
                        if blob_deleted { "" } else { " (no stored file)" }
                    );
                }
            }
        }
    }

    Ok(())
}

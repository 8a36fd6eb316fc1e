//! ragcore: hybrid retrieval for retrieval-augmented generation
//!
//! Command-line front end for chunking, ingestion, listing and search.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::OutputFormat;
use ragcore::{config::Config, logging::init_logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragcore")]
#[command(about = "Hybrid semantic and lexical retrieval for RAG")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "ragcore.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Split a file into chunks and print them as JSON
    Chunk {
        /// File to split
        file: PathBuf,
    },

    /// Ingest a file or a directory of .txt/.md files
    Ingest {
        /// Path to file or directory
        path: PathBuf,

        /// Target collection
        #[arg(long)]
        collection: Option<String>,
    },

    /// Search a collection
    Search {
        /// Search query
        query: String,

        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Drop results scoring below this value (0.0-1.0)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Vector similarity only, no lexical fusion
        #[arg(long)]
        no_hybrid: bool,

        /// Rerank the fused results
        #[arg(long)]
        rerank: bool,

        /// Collection to search
        #[arg(long)]
        collection: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List stored documents, or the chunks of one document
    List {
        /// Collection to list
        #[arg(long)]
        collection: Option<String>,

        /// Show the chunks of this document instead
        #[arg(long = "doc")]
        doc_id: Option<String>,

        /// Page number, from 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Documents per page
        #[arg(long, default_value_t = 20)]
        page_size: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Delete every chunk of a document
    Delete {
        /// Document ID
        doc_id: String,

        /// Collection holding the document
        #[arg(long)]
        collection: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Init { path, force } => commands::init_config(path, force),
        Commands::Chunk { file } => commands::chunk_file(config, file),
        Commands::Ingest { path, collection } => {
            commands::ingest_path(config, path, collection).await
        }
        Commands::Search {
            query,
            top_k,
            threshold,
            no_hybrid,
            rerank,
            collection,
            format,
        } => {
            let options = commands::SearchOptions {
                top_k,
                threshold,
                use_hybrid: !no_hybrid,
                rerank,
                collection,
                format,
            };
            commands::search(config, query, options).await
        }
        Commands::List {
            collection,
            doc_id,
            page,
            page_size,
            format,
        } => {
            let options = commands::ListOptions {
                collection,
                doc_id,
                page,
                page_size,
                format,
            };
            commands::list(config, options).await
        }
        Commands::Delete { doc_id, collection } => {
            commands::delete_document(config, doc_id, collection).await
        }
    }
}

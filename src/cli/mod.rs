//! CLI module for Kenning.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kenning - a grounded chatbot over your own documents
///
/// Ingests a directory of biography and project write-ups into a vector
/// store and answers questions about them over HTTP or the command line.
#[derive(Parser, Debug)]
#[command(name = "kenning")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the knowledge base from a directory of documents
    Ingest {
        /// Directory containing .txt/.md documents (defaults to ingest.source_dir)
        #[arg(short, long)]
        source_dir: Option<String>,
    },

    /// Start the HTTP chat API
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a question and get a grounded answer
    Ask {
        /// The question to ask
        question: String,

        /// Number of records to retrieve (defaults to rag.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Search the knowledge base without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Show what the knowledge base contains
    Stats,

    /// Check configuration and connectivity prerequisites
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (secrets masked)
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

//! Kenning - a grounded chatbot backend
//!
//! Answers questions about one person's background and projects using only
//! what their own documents say.
//!
//! # Overview
//!
//! Kenning has two halves:
//! - An ingestion pipeline that chunks a directory of biography and project
//!   write-ups, embeds every chunk and replaces the knowledge base with them
//! - A query path that embeds a question, retrieves the closest chunks and
//!   asks a generative model to answer from that context alone, over HTTP
//!   (`POST /api/chat`) or the command line
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `chunking` - Paragraph and section chunking strategies
//! - `gemini` - Shared HTTP client for the Gemini API
//! - `embedding` - Embedding generation
//! - `generation` - Text generation
//! - `knowledge_store` - Vector store abstraction (MongoDB Atlas, SQLite, memory)
//! - `orchestrator` - Ingestion pipeline
//! - `rag` - RAG engine for question answering
//! - `server` - HTTP chat API
//!
//! # Example
//!
//! ```rust,no_run
//! use kenning::config::Settings;
//! use kenning::orchestrator::Orchestrator;
//! use kenning::rag::RagEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!
//!     let orchestrator = Orchestrator::new(settings.clone()).await?;
//!     let report = orchestrator.ingest_directory(&settings.source_dir()).await?;
//!     println!("Indexed {} records", report.records_inserted);
//!
//!     let engine = RagEngine::from_settings(&settings).await?;
//!     let response = engine.ask("Which projects use Rust?").await?;
//!     println!("{}", response.reply);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod knowledge_store;
pub mod orchestrator;
pub mod rag;
pub mod server;

pub use error::{KenningError, Result};

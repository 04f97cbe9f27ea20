//! RAG (Retrieval-Augmented Generation) for grounded question answering.
//!
//! Answers questions from the knowledge base. The query path only ever
//! reads the store.

pub mod context;
mod response;

pub use context::ContextBuilder;
pub use response::{RagEngine, RagResponse};

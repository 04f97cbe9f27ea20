//! Embedding generation for semantic search and retrieval.

mod gemini;

pub use gemini::GeminiEmbedder;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Hint telling the provider what an embedding will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Text stored in the knowledge base.
    RetrievalDocument,
    /// A question searched against the knowledge base.
    RetrievalQuery,
}

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one vector per input in input order.
    async fn embed_batch(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

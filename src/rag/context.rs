//! Context building for RAG responses.

use crate::embedding::{Embedder, TaskType};
use crate::error::Result;
use crate::knowledge_store::{KnowledgeReader, SearchMatch};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default number of records retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Default candidate pool for approximate search.
pub const DEFAULT_NUM_CANDIDATES: usize = 100;

/// Builds grounding context from the knowledge base.
pub struct ContextBuilder {
    reader: Arc<dyn KnowledgeReader>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    num_candidates: usize,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(reader: Arc<dyn KnowledgeReader>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            reader,
            embedder,
            top_k: DEFAULT_TOP_K,
            num_candidates: DEFAULT_NUM_CANDIDATES,
        }
    }

    /// Set the number of records to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the candidate pool for approximate search.
    pub fn with_num_candidates(mut self, num_candidates: usize) -> Self {
        self.num_candidates = num_candidates;
        self
    }

    /// Embed `query` and search the store, propagating any failure.
    #[instrument(skip(self), fields(top_k = self.top_k))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let embedding = self.embedder.embed(query, TaskType::RetrievalQuery).await?;
        let matches = self
            .reader
            .vector_search(&embedding, self.top_k, self.num_candidates)
            .await?;

        debug!("Retrieved {} records", matches.len());
        Ok(matches)
    }

    /// Build context for a question.
    ///
    /// Embedding and search failures are logged and yield no context.
    pub async fn build(&self, question: &str) -> Vec<SearchMatch> {
        match self.search(question).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Retrieval failed, answering without context: {}", e);
                Vec::new()
            }
        }
    }
}

/// Join match texts into the grounding context inserted into the prompt.
pub fn format_context_for_prompt(matches: &[SearchMatch]) -> String {
    matches
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_match(source: &str, text: &str, score: f32) -> SearchMatch {
        SearchMatch {
            source: source.to_string(),
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn test_format_context_joins_with_blank_line() {
        let matches = vec![
            search_match("bio.md", "I write Rust.", 0.9),
            search_match("app.md", "## App\nA chatbot.", 0.8),
        ];
        assert_eq!(
            format_context_for_prompt(&matches),
            "I write Rust.\n\n## App\nA chatbot."
        );
        assert_eq!(format_context_for_prompt(&[]), "");
    }
}

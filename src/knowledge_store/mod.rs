//! Knowledge store abstraction for Kenning.
//!
//! Records are written only by ingestion and read by the query path. The
//! read side is its own trait so the query path cannot mutate the store.

mod memory;
mod mongo;
mod sqlite;

pub use memory::MemoryKnowledgeStore;
pub use mongo::MongoKnowledgeStore;
pub use sqlite::SqliteKnowledgeStore;

use crate::config::{Settings, StoreProvider};
use crate::error::{KenningError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A stored, retrievable unit of grounding text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// File name of the originating document.
    pub source: String,
    /// Chunk text.
    pub text: String,
    /// Embedding of `text`.
    pub embedding: Vec<f32>,
}

impl KnowledgeRecord {
    pub fn new(source: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            embedding,
        }
    }
}

/// A record returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub source: String,
    pub text: String,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Number of stored records for one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub records: usize,
}

/// Read-only access used by the query path.
#[async_trait]
pub trait KnowledgeReader: Send + Sync {
    /// Nearest records to `query`, best first.
    ///
    /// `num_candidates` is the candidate pool for approximate search; exact
    /// backends ignore it.
    async fn vector_search(
        &self,
        query: &[f32],
        limit: usize,
        num_candidates: usize,
    ) -> Result<Vec<SearchMatch>>;

    /// Total number of stored records.
    async fn record_count(&self) -> Result<usize>;

    /// Records per source, sorted by source.
    async fn source_counts(&self) -> Result<Vec<SourceCount>>;
}

/// Full access used by ingestion.
#[async_trait]
pub trait KnowledgeStore: KnowledgeReader {
    /// Remove every record. Returns how many were removed.
    async fn clear(&self) -> Result<usize>;

    /// Insert records in order. Returns how many were inserted.
    async fn insert_many(&self, records: &[KnowledgeRecord]) -> Result<usize>;
}

/// Open the configured store for ingestion.
pub async fn open_store(settings: &Settings) -> Result<Arc<dyn KnowledgeStore>> {
    let store: Arc<dyn KnowledgeStore> = match settings.store.provider {
        StoreProvider::MongoDb => Arc::new(MongoKnowledgeStore::from_settings(&settings.store).await?),
        StoreProvider::Sqlite => Arc::new(SqliteKnowledgeStore::new(&settings.sqlite_path())?),
        StoreProvider::Memory => Arc::new(MemoryKnowledgeStore::new()),
    };
    Ok(store)
}

/// Open the configured store read-only for the query path.
pub async fn open_reader(settings: &Settings) -> Result<Arc<dyn KnowledgeReader>> {
    let store: Arc<dyn KnowledgeReader> = match settings.store.provider {
        StoreProvider::MongoDb => Arc::new(MongoKnowledgeStore::from_settings(&settings.store).await?),
        StoreProvider::Sqlite => Arc::new(SqliteKnowledgeStore::new(&settings.sqlite_path())?),
        StoreProvider::Memory => Arc::new(MemoryKnowledgeStore::new()),
    };
    Ok(store)
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Check that a batch agrees on one dimensionality, and with `existing` if set.
pub(crate) fn check_dimensions(existing: Option<usize>, records: &[KnowledgeRecord]) -> Result<()> {
    let expected = existing.or_else(|| records.first().map(|r| r.embedding.len()));

    if let Some(expected) = expected {
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
            return Err(KenningError::KnowledgeStore(format!(
                "Embedding dimension mismatch for '{}': expected {}, got {}",
                bad.source,
                expected,
                bad.embedding.len()
            )));
        }
    }

    Ok(())
}

/// Rank records by cosine similarity to `query`, best first.
pub(crate) fn rank_by_similarity<'a, I>(query: &[f32], records: I, limit: usize) -> Vec<SearchMatch>
where
    I: IntoIterator<Item = &'a KnowledgeRecord>,
{
    let mut results: Vec<SearchMatch> = records
        .into_iter()
        .map(|record| SearchMatch {
            source: record.source.clone(),
            text: record.text.clone(),
            score: cosine_similarity(query, &record.embedding),
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_check_dimensions() {
        let records = vec![
            KnowledgeRecord::new("a.md", "one", vec![1.0, 0.0]),
            KnowledgeRecord::new("a.md", "two", vec![0.0, 1.0]),
        ];
        assert!(check_dimensions(None, &records).is_ok());
        assert!(check_dimensions(Some(2), &records).is_ok());
        assert!(check_dimensions(Some(3), &records).is_err());

        let mixed = vec![
            KnowledgeRecord::new("a.md", "one", vec![1.0, 0.0]),
            KnowledgeRecord::new("b.md", "two", vec![1.0]),
        ];
        let err = check_dimensions(None, &mixed).unwrap_err();
        assert!(err.to_string().contains("b.md"));
    }

    #[test]
    fn test_rank_by_similarity() {
        let records = vec![
            KnowledgeRecord::new("a.md", "far", vec![0.0, 1.0]),
            KnowledgeRecord::new("b.md", "near", vec![1.0, 0.1]),
            KnowledgeRecord::new("c.md", "exact", vec![1.0, 0.0]),
        ];
        let ranked = rank_by_similarity(&[1.0, 0.0], &records, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].text, "exact");
        assert_eq!(ranked[1].text, "near");
    }
}

//! In-memory knowledge store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    check_dimensions, rank_by_similarity, KnowledgeReader, KnowledgeRecord, KnowledgeStore,
    SearchMatch, SourceCount,
};
use crate::error::{KenningError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory knowledge store.
pub struct MemoryKnowledgeStore {
    records: RwLock<Vec<KnowledgeRecord>>,
}

impl MemoryKnowledgeStore {
    /// Create a new in-memory knowledge store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of every stored record in insertion order.
    pub fn records(&self) -> Result<Vec<KnowledgeRecord>> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<KnowledgeRecord>>> {
        self.records
            .read()
            .map_err(|e| KenningError::KnowledgeStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<KnowledgeRecord>>> {
        self.records
            .write()
            .map_err(|e| KenningError::KnowledgeStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeReader for MemoryKnowledgeStore {
    async fn vector_search(
        &self,
        query: &[f32],
        limit: usize,
        _num_candidates: usize,
    ) -> Result<Vec<SearchMatch>> {
        let records = self.read()?;
        Ok(rank_by_similarity(query, records.iter(), limit))
    }

    async fn record_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let records = self.read()?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in records.iter() {
            *counts.entry(record.source.as_str()).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(source, records)| SourceCount {
                source: source.to_string(),
                records,
            })
            .collect())
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn clear(&self) -> Result<usize> {
        let mut records = self.write()?;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }

    async fn insert_many(&self, batch: &[KnowledgeRecord]) -> Result<usize> {
        let mut records = self.write()?;
        check_dimensions(records.first().map(|r| r.embedding.len()), batch)?;
        records.extend_from_slice(batch);
        Ok(batch.len())
    }
}

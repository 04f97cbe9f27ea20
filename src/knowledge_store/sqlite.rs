//! SQLite-based knowledge store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity. Meant
//! for local development without an Atlas cluster; every search scans all
//! records.

use super::{
    check_dimensions, rank_by_similarity, KnowledgeReader, KnowledgeRecord, KnowledgeStore,
    SearchMatch, SourceCount,
};
use crate::error::{KenningError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_source ON records(source);
"#;

/// SQLite-based knowledge store.
pub struct SqliteKnowledgeStore {
    conn: Mutex<Connection>,
}

impl SqliteKnowledgeStore {
    /// Create a new SQLite knowledge store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite knowledge store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite knowledge store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KenningError::KnowledgeStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn load_records(conn: &Connection) -> Result<Vec<KnowledgeRecord>> {
        let mut stmt = conn.prepare("SELECT source, text, embedding FROM records ORDER BY rowid")?;

        let rows = stmt.query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(2)?;
            Ok(KnowledgeRecord {
                source: row.get(0)?,
                text: row.get(1)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn stored_dimensions(conn: &Connection) -> Result<Option<usize>> {
        let result = conn.query_row("SELECT dimensions FROM records LIMIT 1", [], |row| {
            row.get::<_, i64>(0)
        });

        match result {
            Ok(dims) => Ok(Some(dims as usize)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KnowledgeReader for SqliteKnowledgeStore {
    #[instrument(skip(self, query))]
    async fn vector_search(
        &self,
        query: &[f32],
        limit: usize,
        _num_candidates: usize,
    ) -> Result<Vec<SearchMatch>> {
        let conn = self.lock()?;
        let records = Self::load_records(&conn)?;
        let results = rank_by_similarity(query, &records, limit);

        debug!("Found {} matching records", results.len());
        Ok(results)
    }

    async fn record_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) FROM records GROUP BY source ORDER BY source",
        )?;

        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(SourceCount {
                source: row.get(0)?,
                records: count as usize,
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM records", [])?;
        info!("Deleted {} records", deleted);
        Ok(deleted)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_many(&self, records: &[KnowledgeRecord]) -> Result<usize> {
        let conn = self.lock()?;
        check_dimensions(Self::stored_dimensions(&conn)?, records)?;

        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for record in records {
            tx.execute(
                r#"
                INSERT INTO records (id, source, text, embedding, dimensions, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    uuid::Uuid::new_v4().to_string(),
                    record.source,
                    record.text,
                    Self::embedding_to_bytes(&record.embedding),
                    record.embedding.len() as i64,
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        info!("Inserted {} records", records.len());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_knowledge_store() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();

        store
            .insert_many(&[
                KnowledgeRecord::new("bio.md", "I write Rust.", vec![1.0, 0.0, 0.0]),
                KnowledgeRecord::new("app.md", "## App\nA chatbot.", vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.record_count().await.unwrap(), 2);

        let results = store.vector_search(&[1.0, 0.0, 0.0], 3, 100).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "bio.md");
        assert!((results[0].score - 1.0).abs() < 0.001);

        let counts = store.source_counts().await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].source, "app.md");

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_round_trip_through_blob() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        let embedding = vec![0.25, -1.5, 3.0e-5];
        store
            .insert_many(&[KnowledgeRecord::new("a.md", "x", embedding.clone())])
            .await
            .unwrap();

        let conn = store.lock().unwrap();
        let records = SqliteKnowledgeStore::load_records(&conn).unwrap();
        assert_eq!(records[0].embedding, embedding);
    }

    #[tokio::test]
    async fn test_rejects_dimension_change() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        store
            .insert_many(&[KnowledgeRecord::new("a.md", "x", vec![1.0, 0.0])])
            .await
            .unwrap();

        let result = store
            .insert_many(&[KnowledgeRecord::new("b.md", "y", vec![1.0])])
            .await;
        assert!(result.is_err());

        // After a clear the store accepts a new dimensionality.
        store.clear().await.unwrap();
        store
            .insert_many(&[KnowledgeRecord::new("b.md", "y", vec![1.0])])
            .await
            .unwrap();
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("knowledge.db");

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = SqliteKnowledgeStore::new(&path).unwrap();
            store
                .insert_many(&[KnowledgeRecord::new("a.md", "x", vec![1.0])])
                .await
                .unwrap();
        });

        let reopened = SqliteKnowledgeStore::new(&path).unwrap();
        assert_eq!(rt.block_on(reopened.record_count()).unwrap(), 1);
    }
}

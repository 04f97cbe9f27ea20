//! MongoDB Atlas knowledge store.
//!
//! Similarity search runs server-side through a `$vectorSearch` aggregation,
//! so the collection needs an Atlas vector search index over `embedding`.

use super::{check_dimensions, KnowledgeReader, KnowledgeRecord, KnowledgeStore, SearchMatch, SourceCount};
use crate::config::StoreSettings;
use crate::error::{KenningError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::{Client, Collection};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Knowledge store backed by a MongoDB collection.
pub struct MongoKnowledgeStore {
    collection: Collection<KnowledgeRecord>,
    index_name: String,
}

impl MongoKnowledgeStore {
    /// Connect to `uri` and use `database.collection`.
    ///
    /// The driver connects lazily, so an unreachable cluster surfaces on the
    /// first operation rather than here.
    #[instrument(skip(uri))]
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        index_name: &str,
    ) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| KenningError::ClientInit(format!("Invalid MongoDB connection: {}", e)))?;

        info!("Using MongoDB collection {}.{}", database, collection);

        Ok(Self {
            collection: client.database(database).collection(collection),
            index_name: index_name.to_string(),
        })
    }

    /// Connect using store settings. Fails when no connection string is configured.
    pub async fn from_settings(settings: &StoreSettings) -> Result<Self> {
        let uri = settings
            .mongo_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| KenningError::ClientInit("MONGO_URI is not set".to_string()))?;

        Self::connect(
            uri,
            &settings.database,
            &settings.collection,
            &settings.index_name,
        )
        .await
    }

    /// Aggregation pipeline for an approximate nearest-neighbour query.
    fn search_pipeline(&self, query: &[f32], limit: usize, num_candidates: usize) -> Vec<Document> {
        let query_vector: Vec<f64> = query.iter().map(|&v| f64::from(v)).collect();

        vec![
            doc! {
                "$vectorSearch": {
                    "index": self.index_name.as_str(),
                    "path": "embedding",
                    "queryVector": query_vector,
                    "numCandidates": num_candidates.max(limit) as i64,
                    "limit": limit as i64,
                }
            },
            doc! {
                "$project": {
                    "_id": 0,
                    "source": 1,
                    "text": 1,
                    "score": { "$meta": "vectorSearchScore" },
                }
            },
        ]
    }
}

#[derive(Deserialize)]
struct SourceGroup {
    #[serde(rename = "_id")]
    source: String,
    count: i64,
}

fn decode<T: serde::de::DeserializeOwned>(document: Document) -> Result<T> {
    bson::from_document(document)
        .map_err(|e| KenningError::KnowledgeStore(format!("Malformed document: {}", e)))
}

#[async_trait]
impl KnowledgeReader for MongoKnowledgeStore {
    #[instrument(skip(self, query), fields(index = %self.index_name))]
    async fn vector_search(
        &self,
        query: &[f32],
        limit: usize,
        num_candidates: usize,
    ) -> Result<Vec<SearchMatch>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let pipeline = self.search_pipeline(query, limit, num_candidates);
        let documents: Vec<Document> = self.collection.aggregate(pipeline).await?.try_collect().await?;

        let matches = documents
            .into_iter()
            .map(decode::<SearchMatch>)
            .collect::<Result<Vec<_>>>()?;

        debug!("Found {} matching records", matches.len());
        Ok(matches)
    }

    async fn record_count(&self) -> Result<usize> {
        let count = self.collection.count_documents(doc! {}).await?;
        Ok(count as usize)
    }

    async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$source", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let documents: Vec<Document> = self.collection.aggregate(pipeline).await?.try_collect().await?;

        documents
            .into_iter()
            .map(|document| {
                let group: SourceGroup = decode(document)?;
                Ok(SourceCount {
                    source: group.source,
                    records: group.count as usize,
                })
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for MongoKnowledgeStore {
    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        let result = self.collection.delete_many(doc! {}).await?;
        info!("Deleted {} records", result.deleted_count);
        Ok(result.deleted_count as usize)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_many(&self, records: &[KnowledgeRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let existing = self
            .collection
            .find_one(doc! {})
            .await?
            .map(|record| record.embedding.len());
        check_dimensions(existing, records)?;

        let result = self.collection.insert_many(records).await?;
        info!("Inserted {} records", result.inserted_ids.len());
        Ok(result.inserted_ids.len())
    }
}

//! Ingestion orchestrator for Kenning.
//!
//! Rebuilds the knowledge base from a directory of text documents: clear the
//! store, then chunk, embed and insert every document in turn.

use crate::chunking::{chunk_document, DocumentCategory};
use crate::config::Settings;
use crate::embedding::{Embedder, GeminiEmbedder, TaskType};
use crate::error::{KenningError, Result};
use crate::gemini::GeminiClient;
use crate::knowledge_store::{open_store, KnowledgeRecord, KnowledgeStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Why a document contributed no records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be read as UTF-8 text.
    Unreadable(String),
    /// Chunking produced nothing.
    NoContent,
    /// The provider returned a different number of vectors than chunks.
    EmbeddingMismatch { chunks: usize, embeddings: usize },
    /// A vector had the wrong length.
    DimensionMismatch { expected: usize, actual: usize },
    /// The store rejected the insert.
    StoreFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            SkipReason::NoContent => write!(f, "no content"),
            SkipReason::EmbeddingMismatch { chunks, embeddings } => {
                write!(f, "{} chunks but {} embeddings", chunks, embeddings)
            }
            SkipReason::DimensionMismatch { expected, actual } => {
                write!(f, "expected {}-dimensional embeddings, got {}", expected, actual)
            }
            SkipReason::StoreFailed(e) => write!(f, "store failed: {}", e),
        }
    }
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Indexed { records: usize },
    Skipped(SkipReason),
}

/// Per-document entry in an [`IngestReport`].
#[derive(Debug, Clone)]
pub struct DocumentReport {
    /// File name of the document.
    pub source: String,
    pub category: DocumentCategory,
    pub outcome: DocumentOutcome,
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub documents: Vec<DocumentReport>,
    /// Records inserted during this run.
    pub records_inserted: usize,
    /// Records in the store after the run.
    pub total_records: usize,
}

impl IngestReport {
    /// Number of documents that produced records.
    pub fn indexed_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Indexed { .. }))
            .count()
    }

    /// Documents that were skipped, with the reason.
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.documents.iter().filter_map(|d| match &d.outcome {
            DocumentOutcome::Skipped(reason) => Some((d.source.as_str(), reason)),
            DocumentOutcome::Indexed { .. } => None,
        })
    }
}

/// Documents in `dir` with one of `extensions`, sorted by file name.
///
/// Extensions compare case-insensitively; subdirectories are not descended into.
pub async fn list_documents(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(KenningError::InvalidInput(format!(
            "Source directory not found: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // Follows symlinks, so a linked document counts as a file.
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if is_file && has_extension(&path, extensions) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// The ingestion pipeline.
pub struct Orchestrator {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn KnowledgeStore>,
}

impl Orchestrator {
    /// Create an orchestrator with the configured Gemini embedder and store.
    ///
    /// Fails if either client cannot be constructed; ingestion never runs
    /// half-configured.
    pub async fn new(settings: Settings) -> Result<Self> {
        let client = GeminiClient::from_settings(&settings.gemini)?;
        let embedder: Arc<dyn Embedder> =
            Arc::new(GeminiEmbedder::from_settings(client, &settings.embedding));
        let store = open_store(&settings).await?;

        Ok(Self::with_components(settings, embedder, store))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            settings,
            embedder,
            store,
        }
    }

    /// Replace the store's contents with the documents in `dir`.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        self.ingest_directory_with(dir, |_| {}).await
    }

    /// Like [`Self::ingest_directory`], calling `on_document` after each document.
    #[instrument(skip(self, on_document), fields(dir = %dir.display()))]
    pub async fn ingest_directory_with<F>(&self, dir: &Path, on_document: F) -> Result<IngestReport>
    where
        F: Fn(&DocumentReport),
    {
        let files = list_documents(dir, &self.settings.ingest.extensions).await?;
        info!("Found {} documents to ingest", files.len());

        let removed = self.store.clear().await?;
        info!("Cleared {} existing records", removed);

        let mut report = IngestReport::default();
        for path in &files {
            let document = self.ingest_document(path).await;
            if let DocumentOutcome::Indexed { records } = document.outcome {
                report.records_inserted += records;
            }
            on_document(&document);
            report.documents.push(document);
        }

        report.total_records = self.store.record_count().await?;
        info!(
            "Ingestion complete: {} records from {} of {} documents",
            report.records_inserted,
            report.indexed_count(),
            files.len()
        );

        Ok(report)
    }

    /// Chunk, embed and insert a single document.
    ///
    /// Never fails the run: every problem is logged and reported as a skip.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_document(&self, path: &Path) -> DocumentReport {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let category = DocumentCategory::for_file(path, &self.settings.ingest.biography_files);

        let outcome = match self.index(path, &source, category).await {
            Ok(records) => {
                info!("Indexed {} records from {}", records, source);
                DocumentOutcome::Indexed { records }
            }
            Err(reason) => {
                warn!("Skipping {}: {}", source, reason);
                DocumentOutcome::Skipped(reason)
            }
        };

        DocumentReport {
            source,
            category,
            outcome,
        }
    }

    async fn index(
        &self,
        path: &Path,
        source: &str,
        category: DocumentCategory,
    ) -> std::result::Result<usize, SkipReason> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SkipReason::Unreadable(e.to_string()))?;

        let chunks = chunk_document(&text, category.strategy());
        if chunks.is_empty() {
            return Err(SkipReason::NoContent);
        }
        debug!("{} chunks from {} ({:?})", chunks.len(), source, category);

        let embeddings = match self
            .embedder
            .embed_batch(&chunks, TaskType::RetrievalDocument)
            .await
        {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Embedding failed for {}: {}", source, e);
                Vec::new()
            }
        };

        if embeddings.len() != chunks.len() {
            return Err(SkipReason::EmbeddingMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let expected = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(SkipReason::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        let records: Vec<KnowledgeRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| KnowledgeRecord::new(source, text, embedding))
            .collect();

        self.store
            .insert_many(&records)
            .await
            .map_err(|e| SkipReason::StoreFailed(e.to_string()))
    }
}

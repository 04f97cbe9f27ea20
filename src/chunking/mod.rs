//! Chunking strategies for breaking documents into retrievable units.
//!
//! A document is split either by paragraph or by second-level Markdown
//! section. The caller picks the strategy explicitly, usually through the
//! document's [`DocumentCategory`].

mod paragraph;
mod section;

pub use paragraph::ParagraphChunker;
pub use section::{SectionChunker, HEADING_MARKER};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Split on blank lines.
    Paragraph,
    /// Split before every `## ` heading.
    Section,
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paragraph" => Ok(ChunkingStrategy::Paragraph),
            "section" => Ok(ChunkingStrategy::Section),
            _ => Err(format!("Unknown chunking strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkingStrategy::Paragraph => write!(f, "paragraph"),
            ChunkingStrategy::Section => write!(f, "section"),
        }
    }
}

/// What kind of document is being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    /// The primary biography: short prose paragraphs.
    Biography,
    /// A detailed project write-up organised under `## ` headings.
    Project,
}

impl DocumentCategory {
    /// Resolve the category of a file from the configured biography file names.
    ///
    /// Only the file name is compared, case-insensitively and in full.
    pub fn for_file(path: &Path, biography_files: &[String]) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if biography_files.iter().any(|b| b.to_lowercase() == name) {
            DocumentCategory::Biography
        } else {
            DocumentCategory::Project
        }
    }

    /// The chunking strategy used for this category.
    pub fn strategy(self) -> ChunkingStrategy {
        match self {
            DocumentCategory::Biography => ChunkingStrategy::Paragraph,
            DocumentCategory::Project => ChunkingStrategy::Section,
        }
    }
}

/// Trait for chunking implementations.
///
/// Chunking is a pure text operation and cannot fail. Every returned chunk is
/// non-empty after trimming and chunks keep document order.
pub trait Chunker: Send + Sync {
    /// Split document text into chunks.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Create a chunker based on the strategy.
pub fn create_chunker(strategy: ChunkingStrategy) -> Box<dyn Chunker> {
    match strategy {
        ChunkingStrategy::Paragraph => Box::new(ParagraphChunker::new()),
        ChunkingStrategy::Section => Box::new(SectionChunker::new()),
    }
}

/// Chunk a document with the given strategy.
pub fn chunk_document(text: &str, strategy: ChunkingStrategy) -> Vec<String> {
    create_chunker(strategy).chunk(text)
}

/// Normalise Windows line endings so blank-line and heading detection behave the same.
fn normalize_newlines(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains('\r') {
        std::borrow::Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        std::borrow::Cow::Borrowed(text)
    }
}

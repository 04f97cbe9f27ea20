//! Paragraph chunking.
//!
//! Splits text wherever two consecutive line breaks occur.

use super::{normalize_newlines, Chunker};

/// Blank-line chunker used for the biography.
pub struct ParagraphChunker;

impl ParagraphChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        normalize_newlines(text)
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .map(str::to_string)
            .collect()
    }
}

//! Section chunking for Markdown project write-ups.
//!
//! Splits text immediately before every second-level heading at the start of
//! a line. The heading stays at the front of its chunk.

use super::{normalize_newlines, Chunker};
use regex::Regex;
use std::sync::LazyLock;

/// Marker that opens a second-level Markdown heading.
pub const HEADING_MARKER: &str = "## ";

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?m)^{}", regex::escape(HEADING_MARKER)))
        .expect("heading pattern is valid")
});

/// Heading-boundary chunker used for project documents.
pub struct SectionChunker;

impl SectionChunker {
    pub fn new() -> Self {
        Self
    }

    /// Byte offsets where a new section starts, always beginning with 0.
    fn boundaries(text: &str) -> Vec<usize> {
        let mut starts = vec![0];
        starts.extend(
            HEADING
                .find_iter(text)
                .map(|m| m.start())
                .filter(|&start| start > 0),
        );
        starts
    }
}

impl Default for SectionChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SectionChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let text = normalize_newlines(text);
        let starts = Self::boundaries(&text);

        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(text.len());
                text[start..end].trim()
            })
            .filter(|section| !section.is_empty())
            .map(str::to_string)
            .collect()
    }
}

//! Fixed-width chunking: char windows with a fixed overlap, no sentence
//! awareness.

use chatvid_core::{ChunkingConfig, Document};

use super::helpers::{attribution_prefix, byte_offset_of_char};
use super::types::{Chunk, ChunkStats, ChunkedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChunker {
    chunk_size: usize,
    overlap: usize,
}

impl FixedChunker {
    /// `overlap` is clamped below `chunk_size` so windows always advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.fixed_chunk_size, config.fixed_overlap)
    }

    /// Split `text` into windows of `chunk_size` chars, each starting
    /// `chunk_size - overlap` chars after the previous one. Whitespace-only
    /// windows are skipped; the last window ends at the end of the text.
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < text.len() {
            let rest = &text[start..];
            let end = byte_offset_of_char(rest, self.chunk_size).map_or(text.len(), |o| start + o);
            let window = &text[start..end];

            if !window.trim().is_empty() {
                chunks.push(Chunk {
                    index: chunks.len(),
                    text: window.to_string(),
                    char_count: window.chars().count(),
                    sentence_count: 0,
                    is_continuation: self.overlap > 0 && start > 0,
                    truncated: false,
                    start,
                    end,
                    page_start: None,
                    page_end: None,
                });
            }
            if end == text.len() {
                break;
            }
            start += byte_offset_of_char(rest, step).unwrap_or(rest.len());
        }
        chunks
    }

    pub fn chunk(&self, doc: &Document, attribute_source: bool) -> ChunkedDocument {
        if doc.is_blank() {
            return ChunkedDocument::empty(&doc.source_id);
        }
        let chunks = if attribute_source {
            self.chunk_text(&(attribution_prefix(&doc.source_id) + &doc.text))
        } else {
            self.chunk_text(&doc.text)
        };

        let mut stats = ChunkStats {
            chunk_count: chunks.len(),
            ..ChunkStats::default()
        };
        if !chunks.is_empty() {
            let total: usize = chunks.iter().map(|c| c.char_count).sum();
            stats.average_chunk_chars = total as f64 / chunks.len() as f64;
        }
        tracing::debug!(source = %doc.source_id, chunks = chunks.len(), "Fixed-size chunking done");

        ChunkedDocument {
            source_id: doc.source_id.clone(),
            chunks,
            stats,
        }
    }
}

//! Span, fragment, chunk and statistics types.

use serde::{Deserialize, Serialize};

use super::backend::BackendKind;

// ── Spans ───────────────────────────────────────────────────────────────────

/// A sentence as a byte range into the owning text.
///
/// Backends emit spans that tile their input: contiguous, non-overlapping,
/// covering every byte. A span holds the sentence plus its trailing whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize,
}

impl SentenceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Length in chars, the unit every size bound is expressed in.
    pub fn char_len(&self, text: &str) -> usize {
        self.as_str(text).chars().count()
    }

    pub fn is_blank(&self, text: &str) -> bool {
        self.as_str(text).trim().is_empty()
    }
}

// ── Fragments ───────────────────────────────────────────────────────────────

/// A packing unit: a whole sentence, or a piece of an oversized one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub span: SentenceSpan,
    /// Cached `span.char_len(text)`.
    pub chars: usize,
    /// Produced by a hard cut through an unbroken token.
    pub truncated: bool,
}

impl Fragment {
    pub fn whole(text: &str, span: SentenceSpan) -> Self {
        Self {
            span,
            chars: span.char_len(text),
            truncated: false,
        }
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A chunk of text ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based index within the document.
    pub index: usize,
    /// The chunk text, trimmed of surrounding whitespace.
    pub text: String,
    /// Length of `text` in chars.
    pub char_count: usize,
    /// Sentences and fragments packed into this chunk, overlap included.
    pub sentence_count: usize,
    /// Starts with overlap sentences carried over from the previous chunk.
    pub is_continuation: bool,
    /// Contains a fragment that was hard-cut mid-token.
    pub truncated: bool,
    /// Byte offset of `text` in the chunked text.
    pub start: usize,
    /// Byte offset one past the end of `text`.
    pub end: usize,
    /// First page covered (page-aware chunking only).
    pub page_start: Option<usize>,
    /// Last page covered (page-aware chunking only).
    pub page_end: Option<usize>,
}

impl Chunk {
    /// UTF-8 encoded size, the measure the downstream payload ceiling uses.
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }
}

// ── Statistics ──────────────────────────────────────────────────────────────

/// Per-document observability record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStats {
    /// Backend that produced the sentences. `None` for fixed chunking, blank
    /// documents, or when every backend failed and the whole text was split
    /// as a single unit.
    pub backend: Option<BackendKind>,
    /// Backends that failed on this document before `backend` succeeded.
    pub degraded_from: Vec<BackendKind>,
    /// Sentence spans after whitespace normalization, before splitting.
    pub sentence_count: usize,
    pub oversized_sentences: usize,
    pub truncated_fragments: usize,
    pub chunk_count: usize,
    pub average_chunk_chars: f64,
    /// Chunks over the downstream payload ceiling in bytes.
    pub payload_violations: usize,
}

/// Chunks of one document plus its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub source_id: String,
    pub chunks: Vec<Chunk>,
    pub stats: ChunkStats,
}

impl ChunkedDocument {
    pub fn empty(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            chunks: Vec::new(),
            stats: ChunkStats::default(),
        }
    }

    /// `(text, char_count)` pairs in document order, the shape the
    /// embedding/indexing side consumes.
    pub fn payloads(&self) -> impl Iterator<Item = (&str, usize)> {
        self.chunks.iter().map(|c| (c.text.as_str(), c.char_count))
    }
}

//! Strategy dispatch: semantic or fixed, single document, batches and
//! paginated documents.

use chatvid_core::{ChunkingConfig, ChunkingStrategy, Document, PageText};
use rayon::prelude::*;

use super::fixed::FixedChunker;
use super::helpers::attribution_prefix;
use super::semantic::SemanticChunker;
use super::types::{Chunk, ChunkedDocument};

/// Separator placed between pages when a paginated document is chunked as
/// one text.
const PAGE_SEPARATOR: &str = "\n\n";

/// A chunker for the configured strategy.
pub enum DocumentChunker {
    Semantic(SemanticChunker),
    Fixed {
        chunker: FixedChunker,
        attribute_source: bool,
    },
}

impl DocumentChunker {
    pub fn from_config(config: &ChunkingConfig) -> Self {
        match config.strategy {
            ChunkingStrategy::Semantic => Self::Semantic(SemanticChunker::from_config(config.clone())),
            ChunkingStrategy::Fixed => Self::Fixed {
                chunker: FixedChunker::from_config(config),
                attribute_source: config.attribute_source,
            },
        }
    }

    pub fn chunk(&self, doc: &Document) -> ChunkedDocument {
        match self {
            Self::Semantic(chunker) => chunker.chunk(doc),
            Self::Fixed {
                chunker,
                attribute_source,
            } => chunker.chunk(doc, *attribute_source),
        }
    }

    fn attribute_source(&self) -> bool {
        match self {
            Self::Semantic(chunker) => chunker.config().attribute_source,
            Self::Fixed {
                attribute_source, ..
            } => *attribute_source,
        }
    }
}

/// Chunk one document with the configured strategy.
pub fn chunk_document(doc: &Document, config: &ChunkingConfig) -> ChunkedDocument {
    DocumentChunker::from_config(config).chunk(doc)
}

/// Chunk independent documents in parallel. Output order matches input.
pub fn chunk_documents(docs: &[Document], config: &ChunkingConfig) -> Vec<ChunkedDocument> {
    let chunker = DocumentChunker::from_config(config);
    let results: Vec<ChunkedDocument> = docs.par_iter().map(|doc| chunker.chunk(doc)).collect();

    let chunks: usize = results.iter().map(|r| r.chunks.len()).sum();
    tracing::info!(documents = docs.len(), chunks, "Chunked batch");
    results
}

/// Chunk a paginated document as one text and record which pages each chunk
/// spans. Chunks may cross page boundaries.
pub fn chunk_pages(pages: &[PageText], source_id: &str, config: &ChunkingConfig) -> ChunkedDocument {
    let mut text = String::new();
    let mut page_starts = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            text.push_str(PAGE_SEPARATOR);
        }
        page_starts.push((text.len(), page.page_number));
        text.push_str(&page.text);
    }

    let chunker = DocumentChunker::from_config(config);
    let offset = if chunker.attribute_source() {
        attribution_prefix(source_id).len()
    } else {
        0
    };
    let mut out = chunker.chunk(&Document::new(source_id, text));
    for chunk in &mut out.chunks {
        annotate_pages(chunk, &page_starts, offset);
    }
    out
}

/// Map a chunk's byte range (shifted by the attribution prefix) to the first
/// and last page it touches.
fn annotate_pages(chunk: &mut Chunk, page_starts: &[(usize, usize)], offset: usize) {
    let page_at = |pos: usize| {
        page_starts
            .iter()
            .rev()
            .find(|(start, _)| *start <= pos)
            .or_else(|| page_starts.first())
            .map(|&(_, number)| number)
    };
    let start = chunk.start.saturating_sub(offset);
    let last = chunk.end.saturating_sub(offset).saturating_sub(1).max(start);
    chunk.page_start = page_at(start);
    chunk.page_end = page_at(last);
}

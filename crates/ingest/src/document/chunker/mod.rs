//! Semantic chunking engine.
//!
//! Splits extracted document text into bounded, sentence-aligned chunks for
//! embedding:
//!
//! 1. a [`BackendSelector`] picks the sentence backend (with a fallback chain),
//! 2. the backend segments the text into spans that tile it,
//! 3. spans longer than the ceiling go through [`split_oversized`],
//! 4. [`pack`] groups the bounded units into chunks with sentence overlap.
//!
//! Every chunk holds at most `max_chunk_size` chars, and chunking always
//! terminates and returns a value, whatever the input.

pub mod backend;
pub mod error;
mod fixed;
mod helpers;
mod packer;
pub mod selector;
mod semantic;
mod splitter;
mod strategies;
mod types;

pub use backend::{BackendKind, SentenceBackend};
pub use error::ChunkingError;
pub use fixed::FixedChunker;
pub use packer::{pack, PackerConfig};
pub use selector::{BackendCapabilities, BackendCapability, BackendSelector};
pub use semantic::{ChunkProgress, LogProgress, ProgressSink, SemanticChunker};
pub use splitter::split_oversized;
pub use strategies::{chunk_document, chunk_documents, chunk_pages, DocumentChunker};
pub use types::{Chunk, ChunkStats, ChunkedDocument, Fragment, SentenceSpan};

//! Document ingestion: turns extracted document text into bounded,
//! sentence-aligned chunks ready for embedding.

pub mod document;

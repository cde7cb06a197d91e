//! Chunking of extracted documents.
//!
//! Text extraction itself happens upstream; this module receives a
//! [`Document`] (or a list of [`PageText`]s) and produces chunks.

pub mod chunker;

pub use chatvid_core::{Document, PageText};

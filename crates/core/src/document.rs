use serde::{Deserialize, Serialize};

/// Extracted document text handed to the chunker.
///
/// Built by a document reader, consumed once by chunking and not retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Label used for attribution (usually the file name).
    pub source_id: String,
    /// Normalized document text.
    pub text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }

    /// Length in Unicode scalar values.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Empty or whitespace-only documents produce no chunks.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One page of a paginated document (PDF readers emit these).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page_number: usize,
    pub text: String,
}

impl PageText {
    pub fn new(page_number: usize, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

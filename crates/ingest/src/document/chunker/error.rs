use thiserror::Error;

use super::backend::BackendKind;

/// Recoverable chunking failures. The semantic chunker resolves all of these
/// through its backend fallback chain; none of them aborts a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("sentence backend '{0}' is not available in this build")]
    BackendUnavailable(BackendKind),

    #[error("{backend} segmentation failed: {message}")]
    Segmentation { backend: BackendKind, message: String },

    #[error("{backend} returned spans that do not tile the input: {detail}")]
    InvalidSpans { backend: BackendKind, detail: String },
}

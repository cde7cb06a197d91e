//! Sentence segmentation backends.
//!
//! Every backend turns a text into spans that tile it. Backends differ in
//! accuracy and cost; the [`super::selector::BackendSelector`] decides which
//! one runs and in what order they are tried when one fails.

mod abbreviations;
mod pattern;

#[cfg(feature = "linguistic")]
mod linguistic;
#[cfg(feature = "statistical")]
mod statistical;

use std::fmt;
use std::sync::Arc;

use chatvid_core::BackendPreference;
use serde::{Deserialize, Serialize};

use super::error::ChunkingError;
use super::types::SentenceSpan;

#[cfg(feature = "linguistic")]
pub use linguistic::LinguisticBackend;
pub use pattern::PatternBackend;
#[cfg(feature = "statistical")]
pub use statistical::StatisticalBackend;

/// A concrete backend variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Pattern,
    Statistical,
    Linguistic,
}

impl BackendKind {
    /// Highest priority first.
    pub const BY_PRIORITY: [BackendKind; 3] = [
        BackendKind::Linguistic,
        BackendKind::Statistical,
        BackendKind::Pattern,
    ];

    /// Priority rank; higher wins.
    pub fn rank(self) -> u8 {
        match self {
            Self::Linguistic => 3,
            Self::Statistical => 2,
            Self::Pattern => 1,
        }
    }

    /// `None` for [`BackendPreference::Auto`].
    pub fn from_preference(pref: BackendPreference) -> Option<Self> {
        match pref {
            BackendPreference::Auto => None,
            BackendPreference::Pattern => Some(Self::Pattern),
            BackendPreference::Statistical => Some(Self::Statistical),
            BackendPreference::Linguistic => Some(Self::Linguistic),
        }
    }

    /// Whether this build carries the backend's code and dependencies.
    pub fn is_compiled(self) -> bool {
        match self {
            Self::Pattern => true,
            Self::Statistical => cfg!(feature = "statistical"),
            Self::Linguistic => cfg!(feature = "linguistic"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => f.write_str("pattern"),
            Self::Statistical => f.write_str("statistical"),
            Self::Linguistic => f.write_str("linguistic"),
        }
    }
}

/// Sentence segmentation strategy.
pub trait SentenceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Split `text` into sentence spans that tile it, in order.
    fn segment(&self, text: &str) -> Result<Vec<SentenceSpan>, ChunkingError>;
}

/// Construct the backend for `kind`, if this build includes it.
pub fn instantiate(kind: BackendKind) -> Result<Arc<dyn SentenceBackend>, ChunkingError> {
    match kind {
        BackendKind::Pattern => Ok(Arc::new(PatternBackend::new())),
        #[cfg(feature = "statistical")]
        BackendKind::Statistical => Ok(Arc::new(StatisticalBackend::new())),
        #[cfg(feature = "linguistic")]
        BackendKind::Linguistic => Ok(Arc::new(LinguisticBackend::new())),
        #[allow(unreachable_patterns)]
        other => Err(ChunkingError::BackendUnavailable(other)),
    }
}

/// Check that `spans` tile `text`: contiguous, non-empty, on char
/// boundaries, from 0 to `text.len()`.
pub fn validate_tiling(
    backend: BackendKind,
    text: &str,
    spans: &[SentenceSpan],
) -> Result<(), ChunkingError> {
    let invalid = |detail: String| ChunkingError::InvalidSpans { backend, detail };

    if text.is_empty() {
        return if spans.is_empty() {
            Ok(())
        } else {
            Err(invalid("spans returned for empty text".to_string()))
        };
    }
    let Some(first) = spans.first() else {
        return Err(invalid("no spans for non-empty text".to_string()));
    };
    if first.start != 0 {
        return Err(invalid(format!("first span starts at {}", first.start)));
    }

    let mut expected = 0;
    for span in spans {
        if span.start != expected {
            return Err(invalid(format!(
                "gap or overlap at byte {} (expected {})",
                span.start, expected
            )));
        }
        if span.end <= span.start || span.end > text.len() {
            return Err(invalid(format!("bad span {}..{}", span.start, span.end)));
        }
        if !text.is_char_boundary(span.end) {
            return Err(invalid(format!("span end {} splits a char", span.end)));
        }
        expected = span.end;
    }
    if expected != text.len() {
        return Err(invalid(format!(
            "spans end at {} but text has {} bytes",
            expected,
            text.len()
        )));
    }
    Ok(())
}

//! Punctuation-driven sentence splitting. Always available.

use once_cell::sync::Lazy;
use regex::Regex;

use super::abbreviations::{is_abbreviation, is_dotted};
use super::{BackendKind, SentenceBackend};
use crate::document::chunker::error::ChunkingError;
use crate::document::chunker::helpers::{next_visible_char, tile_at_ends, word_before};
use crate::document::chunker::types::SentenceSpan;

// A run of terminal punctuation plus any closing quotes or brackets.
pub(crate) static TERMINAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?]+["'”’)\]]*"#).expect("Invalid sentence terminal pattern")
});

/// Terminal punctuation runs followed by whitespace or end of text, as
/// `(punctuation_start, run_end)` byte pairs.
pub(crate) fn terminal_runs(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    TERMINAL.find_iter(text).filter_map(move |m| {
        let followed_by_space = text[m.end()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace);
        followed_by_space.then(|| (m.start(), m.end()))
    })
}

/// Splits after `.`, `!` and `?` followed by whitespace or end of text,
/// skipping periods that close a known abbreviation or an initial.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternBackend;

impl PatternBackend {
    pub fn new() -> Self {
        Self
    }

    fn is_boundary(text: &str, punct_start: usize, run_end: usize) -> bool {
        let run = text[punct_start..run_end].trim_end_matches(|c: char| !matches!(c, '.' | '!' | '?'));
        if run != "." {
            return true;
        }
        let word = word_before(text, punct_start);
        if word.is_empty() {
            return true;
        }
        if is_abbreviation(word) {
            return false;
        }
        if is_dotted(word) {
            // "e.g. the" continues, "in the U.S. The" ends.
            return next_visible_char(text, run_end).map_or(true, char::is_uppercase);
        }
        true
    }
}

impl SentenceBackend for PatternBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Pattern
    }

    fn segment(&self, text: &str) -> Result<Vec<SentenceSpan>, ChunkingError> {
        let ends = terminal_runs(text)
            .filter(|&(start, end)| Self::is_boundary(text, start, end))
            .map(|(_, end)| end);
        Ok(tile_at_ends(text, ends))
    }
}

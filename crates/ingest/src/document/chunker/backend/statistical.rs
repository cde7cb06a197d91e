//! Punkt-style sentence boundary classifier.
//!
//! Candidate boundaries are the same terminal-punctuation runs the pattern
//! backend uses. A period is then classified with two kinds of evidence:
//!
//! - **Abbreviation evidence**: the word before the period is a known
//!   abbreviation (the built-in prior), has internal periods, or behaves like
//!   an abbreviation in this document: short, seen at least twice with a
//!   trailing period and never without one.
//! - **Orthographic evidence**: after an abbreviation, a capitalized next word
//!   only starts a new sentence if the same word also occurs lowercase
//!   elsewhere in the document (or is a common sentence opener); otherwise the
//!   capital is taken to be a proper noun.
//!
//! Inputs larger than the batch threshold are segmented in sequential
//! batches, each with its own statistics, so memory stays bounded.

use std::collections::{HashMap, HashSet};

use super::abbreviations::{is_abbreviation, is_dotted};
use super::pattern::terminal_runs;
use super::{BackendKind, SentenceBackend};
use crate::document::chunker::error::ChunkingError;
use crate::document::chunker::helpers::{char_count, tile_at_ends, word_before};
use crate::document::chunker::types::SentenceSpan;

/// Batch size in bytes above which input is segmented in pieces.
pub const DEFAULT_BATCH_THRESHOLD: usize = 500_000;

const SENTENCE_OPENERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "it", "he", "she", "we", "they", "i",
    "there", "in", "on", "at", "but", "and", "however", "then", "if", "when", "our", "my",
];

/// Longest word (in chars) that can be learned as an abbreviation.
const MAX_LEARNED_ABBREVIATION: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct StatisticalBackend {
    batch_threshold: usize,
}

impl Default for StatisticalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticalBackend {
    pub fn new() -> Self {
        Self {
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
        }
    }

    pub fn with_batch_threshold(batch_threshold: usize) -> Self {
        Self {
            batch_threshold: batch_threshold.max(1),
        }
    }

    /// Batch end offsets. Prefers a sentence end followed by whitespace, then
    /// any whitespace; fails when a whole batch window holds no whitespace.
    fn batch_cuts(&self, text: &str) -> Result<Vec<usize>, ChunkingError> {
        let mut cuts = Vec::new();
        let mut start = 0;

        while text.len() - start > self.batch_threshold {
            let mut limit = start + self.batch_threshold;
            while !text.is_char_boundary(limit) {
                limit -= 1;
            }
            let window = &text[start..limit];

            let sentence_cut = terminal_runs(window)
                .filter(|&(_, end)| end < window.len())
                .last()
                .map(|(_, end)| {
                    let rest = &text[start + end..];
                    start + end + (rest.len() - rest.trim_start().len())
                });
            let space_cut = || {
                window
                    .char_indices()
                    .rev()
                    .find(|(_, c)| c.is_whitespace())
                    .map(|(i, c)| start + i + c.len_utf8())
            };

            let cut = sentence_cut.or_else(space_cut).ok_or_else(|| ChunkingError::Segmentation {
                backend: BackendKind::Statistical,
                message: format!(
                    "no whitespace within {} bytes after offset {start}, cannot batch",
                    self.batch_threshold
                ),
            })?;
            cuts.push(cut);
            start = cut;
        }
        Ok(cuts)
    }

    fn segment_batch(&self, text: &str) -> Vec<SentenceSpan> {
        let stats = DocumentStats::collect(text);
        let ends = terminal_runs(text)
            .filter(|&(start, end)| stats.is_boundary(text, start, end))
            .map(|(_, end)| end);
        tile_at_ends(text, ends)
    }
}

impl SentenceBackend for StatisticalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Statistical
    }

    fn segment(&self, text: &str) -> Result<Vec<SentenceSpan>, ChunkingError> {
        if text.len() <= self.batch_threshold {
            return Ok(self.segment_batch(text));
        }

        let cuts = self.batch_cuts(text)?;
        let total = cuts.len() + 1;
        let mut spans = Vec::new();
        let mut start = 0;
        for (i, end) in cuts.into_iter().chain(std::iter::once(text.len())).enumerate() {
            tracing::debug!(batch = i + 1, total, bytes = end - start, "segmenting batch");
            spans.extend(
                self.segment_batch(&text[start..end])
                    .into_iter()
                    .map(|s| SentenceSpan::new(s.start + start, s.end + start)),
            );
            start = end;
        }
        Ok(spans)
    }
}

// ── Per-document statistics ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DocumentStats {
    with_period: HashMap<String, usize>,
    without_period: HashMap<String, usize>,
    seen_lowercase: HashSet<String>,
}

impl DocumentStats {
    fn collect(text: &str) -> Self {
        let mut stats = Self::default();
        for raw in text.split_whitespace() {
            let token = raw
                .trim_start_matches(|c: char| !c.is_alphanumeric())
                .trim_end_matches(|c: char| !c.is_alphanumeric() && c != '.');
            if token.is_empty() {
                continue;
            }
            let lower = token.to_lowercase();
            match lower.strip_suffix('.') {
                Some(word) if !word.is_empty() && !word.ends_with('.') => {
                    *stats.with_period.entry(word.to_string()).or_default() += 1;
                }
                Some(_) => {}
                None => {
                    if token.starts_with(char::is_lowercase) {
                        stats.seen_lowercase.insert(lower.clone());
                    }
                    *stats.without_period.entry(lower).or_default() += 1;
                }
            }
        }
        stats
    }

    fn is_learned_abbreviation(&self, lower: &str) -> bool {
        char_count(lower) <= MAX_LEARNED_ABBREVIATION
            && lower.chars().all(char::is_alphabetic)
            && self.with_period.get(lower).copied().unwrap_or(0) >= 2
            && !self.without_period.contains_key(lower)
    }

    fn starts_sentence(&self, next_word: &str) -> bool {
        let lower = next_word
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        self.seen_lowercase.contains(&lower) || SENTENCE_OPENERS.contains(&lower.as_str())
    }

    fn is_boundary(&self, text: &str, punct_start: usize, run_end: usize) -> bool {
        let next_word = text[run_end..]
            .split_whitespace()
            .next()
            .map(|w| w.trim_start_matches(|c: char| !c.is_alphanumeric()))
            .unwrap_or("");
        let Some(next_first) = next_word.chars().next() else {
            return true;
        };

        let run = text[punct_start..run_end].trim_end_matches(|c: char| !matches!(c, '.' | '!' | '?'));
        if run != "." {
            // "!", "?" and ellipses end a sentence unless the text runs on in lowercase.
            return !next_first.is_lowercase();
        }

        let word = word_before(text, punct_start);
        if word.is_empty() || word.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        let lower = word.to_lowercase();
        let abbreviation =
            is_abbreviation(word) || is_dotted(word) || self.is_learned_abbreviation(&lower);
        if !abbreviation {
            return true;
        }
        next_first.is_uppercase() && self.starts_sentence(next_word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::chunker::backend::validate_tiling;

    fn sentences(backend: &StatisticalBackend, text: &str) -> Vec<String> {
        backend
            .segment(text)
            .unwrap()
            .iter()
            .map(|s| s.as_str(text).to_string())
            .collect()
    }

    #[test]
    fn abbreviation_before_proper_noun_does_not_split() {
        let backend = StatisticalBackend::new();
        let text = "We met Dr. Watson today. The weather was fine.";
        assert_eq!(
            sentences(&backend, text),
            vec!["We met Dr. Watson today. ", "The weather was fine."]
        );
    }

    #[test]
    fn abbreviation_before_common_word_splits() {
        let backend = StatisticalBackend::new();
        let text = "He lives on Baker St. The house is old.";
        assert_eq!(
            sentences(&backend, text),
            vec!["He lives on Baker St. ", "The house is old."]
        );
    }

    #[test]
    fn learns_abbreviations_from_the_document() {
        let backend = StatisticalBackend::new();
        let text = "See approx. Paris for detail. Also tbsp. Salt and tbsp. Pepper go in.";
        let spans = sentences(&backend, text);
        assert_eq!(
            spans,
            vec!["See approx. Paris for detail. ", "Also tbsp. Salt and tbsp. Pepper go in."]
        );
    }

    #[test]
    fn lowercase_after_exclamation_continues() {
        let backend = StatisticalBackend::new();
        let text = "Yahoo! is a company. It exists.";
        assert_eq!(
            sentences(&backend, text),
            vec!["Yahoo! is a company. ", "It exists."]
        );
    }

    #[test]
    fn large_input_is_batched_at_sentence_ends() {
        let backend = StatisticalBackend::with_batch_threshold(64);
        let text = "This sentence is thirty chars. ".repeat(20);
        let cuts = backend.batch_cuts(&text).unwrap();
        assert!(!cuts.is_empty());
        for cut in &cuts {
            assert!(text[..*cut].ends_with(". "), "cut at {cut} is not after a sentence");
        }
        let spans = backend.segment(&text).unwrap();
        validate_tiling(BackendKind::Statistical, &text, &spans).unwrap();
        assert_eq!(spans.len(), 20);
    }

    #[test]
    fn batching_falls_back_to_whitespace() {
        let backend = StatisticalBackend::with_batch_threshold(16);
        let text = "word ".repeat(40);
        let spans = backend.segment(&text).unwrap();
        validate_tiling(BackendKind::Statistical, &text, &spans).unwrap();
    }

    #[test]
    fn unbatchable_input_is_an_error() {
        let backend = StatisticalBackend::with_batch_threshold(16);
        let text = "x".repeat(100);
        let err = backend.segment(&text).unwrap_err();
        assert!(matches!(err, ChunkingError::Segmentation { backend: BackendKind::Statistical, .. }));
    }
}

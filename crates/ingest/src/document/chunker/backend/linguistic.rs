//! Unicode (UAX #29) sentence boundaries, corrected for abbreviations.

use unicode_segmentation::UnicodeSegmentation;

use super::abbreviations::is_abbreviation;
use super::{BackendKind, SentenceBackend};
use crate::document::chunker::error::ChunkingError;
use crate::document::chunker::helpers::{tile_at_ends, word_before};
use crate::document::chunker::types::SentenceSpan;

/// UAX #29 handles quotes, closing brackets, decimals and lowercase
/// continuations, but breaks after `Mr. Smith`-style abbreviations; those
/// boundaries are dropped again.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinguisticBackend;

impl LinguisticBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SentenceBackend for LinguisticBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Linguistic
    }

    fn segment(&self, text: &str) -> Result<Vec<SentenceSpan>, ChunkingError> {
        let ends = text
            .split_sentence_bound_indices()
            .filter(|(start, sentence)| {
                let body = sentence.trim_end();
                match body.strip_suffix('.') {
                    Some(before) => !is_abbreviation(word_before(text, start + before.len())),
                    None => true,
                }
            })
            .map(|(start, sentence)| start + sentence.len());
        Ok(tile_at_ends(text, ends))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(text: &str) -> Vec<&str> {
        LinguisticBackend::new()
            .segment(text)
            .unwrap()
            .iter()
            .map(|s| s.as_str(text))
            .collect()
    }

    #[test]
    fn splits_plain_sentences() {
        assert_eq!(
            sentences("The cat sat. The dog ran! Why?"),
            vec!["The cat sat. ", "The dog ran! ", "Why?"]
        );
    }

    #[test]
    fn rejoins_after_titles() {
        assert_eq!(
            sentences("Mr. Smith is here. He waits."),
            vec!["Mr. Smith is here. ", "He waits."]
        );
    }

    #[test]
    fn pronoun_i_is_not_rejoined() {
        assert_eq!(
            sentences("So did I. Then we left."),
            vec!["So did I. ", "Then we left."]
        );
    }

    #[test]
    fn keeps_decimals_together() {
        assert_eq!(
            sentences("It costs 3.50 dollars. Cheap."),
            vec!["It costs 3.50 dollars. ", "Cheap."]
        );
    }
}

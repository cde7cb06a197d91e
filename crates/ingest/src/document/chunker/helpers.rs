//! Text and span utilities shared by the backends, splitter and packer.

use super::types::SentenceSpan;

/// Line prepended to a document's text when source attribution is enabled.
pub(crate) fn attribution_prefix(source_id: &str) -> String {
    format!("[Source: {source_id}]\n\n")
}

/// Length in chars.
pub(crate) fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `n`th char, or `None` when `text` has `n` chars or fewer.
pub(crate) fn byte_offset_of_char(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(i, _)| i)
}

/// Byte range of `text[start..end]` with surrounding whitespace removed.
pub(crate) fn trimmed_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let raw = &text[start..end];
    let lead = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    (start + lead, start + lead + trimmed.len())
}

/// The whitespace-delimited word ending at byte `end`, stripped of leading
/// brackets and quotes. `text[..end]` is expected to end with the word's
/// final character (the terminal period excluded).
pub(crate) fn word_before(text: &str, end: usize) -> &str {
    let head = &text[..end];
    let start = head
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    head[start..].trim_start_matches(|c: char| matches!(c, '(' | '[' | '"' | '\'' | '“' | '‘'))
}

/// The first char after any whitespace at `pos`.
pub(crate) fn next_visible_char(text: &str, pos: usize) -> Option<char> {
    text[pos..].chars().find(|c| !c.is_whitespace())
}

/// Build tiling spans from sentence end positions.
///
/// Each end (byte offset just past terminal punctuation) is pushed forward
/// over the whitespace that follows it, so that whitespace belongs to the
/// sentence it trails. Ends are deduplicated; ends at 0 or `text.len()` are
/// ignored. The result always covers `0..text.len()` for non-empty text.
pub(crate) fn tile_at_ends<I>(text: &str, ends: I) -> Vec<SentenceSpan>
where
    I: IntoIterator<Item = usize>,
{
    let mut cuts: Vec<usize> = ends
        .into_iter()
        .map(|end| {
            let rest = &text[end..];
            end + (rest.len() - rest.trim_start().len())
        })
        .filter(|&cut| cut > 0 && cut < text.len())
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut spans = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        spans.push(SentenceSpan::new(start, cut));
        start = cut;
    }
    if start < text.len() {
        spans.push(SentenceSpan::new(start, text.len()));
    }
    spans
}

/// Fold whitespace-only spans into their predecessor (or successor, for a
/// leading one) so every remaining span carries visible text and the spans
/// still tile the input.
pub(crate) fn merge_blank_spans(text: &str, spans: Vec<SentenceSpan>) -> Vec<SentenceSpan> {
    let mut merged: Vec<SentenceSpan> = Vec::with_capacity(spans.len());
    let mut pending_start: Option<usize> = None;

    for span in spans {
        if span.is_blank(text) {
            match merged.last_mut() {
                Some(last) => last.end = span.end,
                None => {
                    pending_start.get_or_insert(span.start);
                }
            }
            continue;
        }
        let start = pending_start.take().unwrap_or(span.start);
        merged.push(SentenceSpan::new(start, span.end));
    }
    merged
}

//! Oversized-sentence splitting.
//!
//! A sentence longer than the ceiling is cut into fragments that tile it.
//! Each cut is taken at the rightmost acceptable point inside a window of
//! `max_chars` chars, trying `;`, `:`, `,` and whitespace in that order. A
//! window with no acceptable point is hard-cut at the ceiling.
//!
//! Every iteration consumes at least one char and at most `max_chars`, so the
//! number of fragments is bounded by `ceil(len / max_chars)` for hard cuts and
//! by the input length overall.

use super::helpers::{byte_offset_of_char, char_count};
use super::types::{Fragment, SentenceSpan};

/// Sub-sentence separators, strongest first.
const SEPARATORS: [char; 3] = [';', ':', ','];

/// Split `span` of `text` into fragments of at most `max_chars` chars.
///
/// Fragments tile `span`. A span that already fits is returned whole.
pub fn split_oversized(text: &str, span: SentenceSpan, max_chars: usize) -> Vec<Fragment> {
    let max_chars = max_chars.max(1);
    let min_piece = (max_chars / 4).max(1);

    let mut fragments = Vec::new();
    let mut start = span.start;

    while start < span.end {
        let rest = &text[start..span.end];
        let Some(limit) = byte_offset_of_char(rest, max_chars) else {
            fragments.push(Fragment::whole(text, SentenceSpan::new(start, span.end)));
            break;
        };
        let window = &rest[..limit];

        let soft_cut = separator_cut(window, min_piece).or_else(|| whitespace_cut(window));
        let (cut, truncated) = match soft_cut {
            Some(cut) => (cut, false),
            None => (limit, !window.trim().is_empty()),
        };

        let piece = SentenceSpan::new(start, start + cut);
        fragments.push(Fragment {
            span: piece,
            chars: piece.char_len(text),
            truncated,
        });
        start += cut;
    }

    fragments
}

/// Rightmost cut just after the strongest separator present, extended over
/// the whitespace that follows it inside the window. The piece before the cut
/// must hold at least `min_piece` chars.
fn separator_cut(window: &str, min_piece: usize) -> Option<usize> {
    SEPARATORS.iter().find_map(|&sep| {
        window
            .char_indices()
            .rev()
            .filter(|&(_, c)| c == sep)
            .map(|(i, c)| i + c.len_utf8())
            .find(|&after| char_count(&window[..after]) >= min_piece)
            .map(|after| {
                let tail = &window[after..];
                after + (tail.len() - tail.trim_start().len())
            })
    })
}

/// Cut after the rightmost whitespace run that has visible text before it.
fn whitespace_cut(window: &str) -> Option<usize> {
    window
        .char_indices()
        .rev()
        .filter(|&(_, c)| c.is_whitespace())
        .find(|&(i, _)| !window[..i].trim().is_empty())
        .map(|(i, c)| i + c.len_utf8())
}

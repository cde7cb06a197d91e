//! Greedy chunk packing with sentence overlap.
//!
//! Units (whole sentences or fragments, each within the ceiling) are appended
//! to a buffer until the next one would push it past `max_chars`; the buffer
//! is then emitted and the next buffer is seeded with the last
//! `overlap_sentences` units of the emitted one.
//!
//! The seed is only applied when it leaves room for the unit that triggered
//! the new buffer. Otherwise it is dropped (or shrunk, under
//! [`OverlapPolicy::Shrink`]) so every iteration consumes one input unit and
//! packing always terminates.

use chatvid_core::{ChunkingConfig, OverlapPolicy};

use super::helpers::{char_count, trimmed_range};
use super::types::{Chunk, Fragment};

/// Size and overlap parameters for [`pack`], in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackerConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    pub target_chars: Option<usize>,
    pub overlap_sentences: usize,
    pub overlap_policy: OverlapPolicy,
}

impl From<&ChunkingConfig> for PackerConfig {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            min_chars: config.min_chunk_size,
            max_chars: config.max_chunk_size,
            target_chars: config.target_chunk_size,
            overlap_sentences: config.overlap_sentences,
            overlap_policy: config.overlap_policy,
        }
    }
}

/// Pack `units` (spans into `text`, in order) into chunks.
pub fn pack(text: &str, units: &[Fragment], config: &PackerConfig) -> Vec<Chunk> {
    let mut packer = Packer {
        text,
        config,
        chunks: Vec::new(),
        buffer: Vec::new(),
        size: 0,
        seeded: 0,
        carry: Vec::new(),
    };

    for &unit in units {
        if !packer.buffer.is_empty() && packer.size + unit.chars > config.max_chars {
            packer.flush(false);
        }
        if packer.buffer.is_empty() {
            packer.seed_for(unit.chars);
        }
        packer.buffer.push(unit);
        packer.size += unit.chars;

        if config.target_chars.is_some_and(|target| packer.size >= target) {
            packer.flush(false);
        }
    }

    // A buffer holding only overlap never exists here: seeding happens when a
    // new unit arrives, and that unit is pushed immediately after.
    if !packer.buffer.is_empty() {
        packer.flush(true);
    }
    packer.chunks
}

struct Packer<'a> {
    text: &'a str,
    config: &'a PackerConfig,
    chunks: Vec<Chunk>,
    buffer: Vec<Fragment>,
    size: usize,
    /// Leading units of `buffer` carried over from the previous chunk.
    seeded: usize,
    /// Overlap candidates from the last emitted chunk.
    carry: Vec<Fragment>,
}

impl Packer<'_> {
    /// Emit the buffer and remember its tail as the next overlap candidate.
    fn flush(&mut self, last: bool) {
        self.carry = self.overlap_tail();

        if let Some(chunk) = self.build_chunk() {
            if !last && chunk.char_count < self.config.min_chars {
                tracing::debug!(
                    index = chunk.index,
                    chars = chunk.char_count,
                    min = self.config.min_chars,
                    "emitting undersized chunk, next unit does not fit"
                );
            }
            self.chunks.push(chunk);
        }
        self.buffer.clear();
        self.size = 0;
        self.seeded = 0;
    }

    /// The buffer from its `overlap_sentences`-th visible unit from the end.
    /// Blank units are carried along but not counted, and a blank-only
    /// buffer carries nothing.
    fn overlap_tail(&self) -> Vec<Fragment> {
        let from = self
            .buffer
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, unit)| !unit.span.is_blank(self.text))
            .take(self.config.overlap_sentences)
            .last()
            .map(|(i, _)| i);
        match from {
            Some(i) => self.buffer[i..].to_vec(),
            None => Vec::new(),
        }
    }

    fn build_chunk(&self) -> Option<Chunk> {
        let first = self.buffer.first()?;
        let last = self.buffer.last()?;
        let (start, end) = trimmed_range(self.text, first.span.start, last.span.end);
        if start == end {
            return None;
        }
        let chunk_text = &self.text[start..end];
        Some(Chunk {
            index: self.chunks.len(),
            text: chunk_text.to_string(),
            char_count: char_count(chunk_text),
            sentence_count: self.buffer.len(),
            is_continuation: self.seeded > 0,
            truncated: self.buffer.iter().any(|f| f.truncated),
            start,
            end,
            page_start: None,
            page_end: None,
        })
    }

    /// Start a new buffer with as much of the carried overlap as the policy
    /// allows, leaving room for a unit of `next_chars`.
    fn seed_for(&mut self, next_chars: usize) {
        let carry = std::mem::take(&mut self.carry);
        if carry.is_empty() {
            return;
        }
        let max = self.config.max_chars;
        let fits = |seed: &[Fragment]| {
            let size: usize = seed.iter().map(|f| f.chars).sum();
            size < max && size + next_chars <= max
        };

        let seed: &[Fragment] = if fits(carry.as_slice()) {
            &carry
        } else {
            match self.config.overlap_policy {
                OverlapPolicy::Drop => {
                    tracing::debug!(
                        units = carry.len(),
                        next_chars,
                        "overlap does not leave room for next unit, dropping it"
                    );
                    &[]
                }
                OverlapPolicy::Shrink => {
                    let keep = (1..carry.len())
                        .map(|skip| &carry[skip..])
                        .find(|&suffix| fits(suffix))
                        .unwrap_or(&[]);
                    tracing::debug!(
                        from = carry.len(),
                        to = keep.len(),
                        next_chars,
                        "shrinking overlap to leave room for next unit"
                    );
                    keep
                }
            }
        };

        let seed: &[Fragment] = if seed.iter().all(|f| f.span.is_blank(self.text)) {
            &[]
        } else {
            seed
        };
        self.size = seed.iter().map(|f| f.chars).sum();
        self.seeded = seed.len();
        self.buffer.extend_from_slice(seed);
    }
}

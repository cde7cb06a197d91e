//! Semantic chunker: segmentation, oversized splitting and packing.

use std::sync::Arc;

use chatvid_core::config::DOWNSTREAM_PAYLOAD_CEILING_BYTES;
use chatvid_core::{ChunkingConfig, Document};

use super::backend::{instantiate, validate_tiling, BackendKind, SentenceBackend};
use super::helpers::{attribution_prefix, char_count, merge_blank_spans};
use super::packer::{pack, PackerConfig};
use super::selector::BackendSelector;
use super::splitter::split_oversized;
use super::types::{ChunkStats, ChunkedDocument, Fragment, SentenceSpan};

/// Sentences between two `Splitting` progress events.
const PROGRESS_INTERVAL: usize = 10_000;

/// Progress of one document through the chunking stages.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkProgress {
    Segmenting { backend: BackendKind, chars: usize },
    Segmented { backend: Option<BackendKind>, sentences: usize },
    Splitting { done: usize, total: usize },
    Packed { chunks: usize, average_chars: f64 },
}

/// Receives progress for documents above the large-document threshold.
pub trait ProgressSink: Sync {
    fn report(&self, source_id: &str, progress: &ChunkProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, &ChunkProgress) + Sync,
{
    fn report(&self, source_id: &str, progress: &ChunkProgress) {
        self(source_id, progress)
    }
}

/// Writes progress to the `info` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, source_id: &str, progress: &ChunkProgress) {
        match progress {
            ChunkProgress::Segmenting { backend, chars } => {
                tracing::info!(source = %source_id, backend = %backend, chars, "Extracting sentences");
            }
            ChunkProgress::Segmented { backend, sentences } => {
                let backend = backend.map_or_else(|| "none".to_string(), |b| b.to_string());
                tracing::info!(source = %source_id, backend = %backend, sentences, "Sentences extracted");
            }
            ChunkProgress::Splitting { done, total } => {
                tracing::info!(source = %source_id, done, total, "Splitting oversized sentences");
            }
            ChunkProgress::Packed {
                chunks,
                average_chars,
            } => {
                tracing::info!(
                    source = %source_id,
                    chunks,
                    average_chars = %format!("{average_chars:.0}"),
                    "Chunks created"
                );
            }
        }
    }
}

/// Sentence-aware chunker.
///
/// Holds a validated config and the ordered list of backends to try. Each
/// call is independent; the chunker itself is immutable and can be shared
/// across threads.
pub struct SemanticChunker {
    config: ChunkingConfig,
    backends: Vec<Arc<dyn SentenceBackend>>,
}

impl SemanticChunker {
    /// Build a chunker whose backends come from `selector`, starting at the
    /// configured preference.
    pub fn new(config: ChunkingConfig, selector: &BackendSelector) -> Self {
        let config = validated(config);
        let backends = selector
            .fallback_chain(config.backend)
            .into_iter()
            .filter_map(|kind| match instantiate(kind) {
                Ok(backend) => Some(backend),
                Err(e) => {
                    tracing::warn!(backend = %kind, "Skipping sentence backend: {e}");
                    None
                }
            })
            .collect();
        Self { config, backends }
    }

    /// Build a chunker over the process-wide backend probe.
    pub fn from_config(config: ChunkingConfig) -> Self {
        let selector = BackendSelector::from_process(&config.disabled_backends);
        Self::new(config, &selector)
    }

    /// Build a chunker with an explicit backend chain, tried in order.
    pub fn with_backends(config: ChunkingConfig, backends: Vec<Arc<dyn SentenceBackend>>) -> Self {
        Self {
            config: validated(config),
            backends,
        }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Backends in the order they are tried.
    pub fn backend_chain(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    pub fn chunk(&self, doc: &Document) -> ChunkedDocument {
        self.chunk_source(&doc.source_id, &doc.text, None)
    }

    pub fn chunk_with_progress(&self, doc: &Document, progress: &dyn ProgressSink) -> ChunkedDocument {
        self.chunk_source(&doc.source_id, &doc.text, Some(progress))
    }

    /// Chunk `text` for `source_id`, applying the attribution prefix.
    /// Chunk offsets refer to the prefixed text.
    pub(crate) fn chunk_source(
        &self,
        source_id: &str,
        text: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> ChunkedDocument {
        if text.trim().is_empty() {
            tracing::debug!(source = %source_id, "Blank document, no chunks");
            return ChunkedDocument::empty(source_id);
        }
        if self.config.attribute_source {
            let prefixed = attribution_prefix(source_id) + text;
            self.chunk_text(source_id, &prefixed, progress)
        } else {
            self.chunk_text(source_id, text, progress)
        }
    }

    fn chunk_text(
        &self,
        source_id: &str,
        text: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> ChunkedDocument {
        let chars = char_count(text);
        let progress = progress.filter(|_| chars >= self.config.large_document_threshold);
        if chars >= self.config.large_document_threshold {
            tracing::info!(source = %source_id, chars, "Large document, chunking may take a while");
        }
        let report = |event: ChunkProgress| {
            if let Some(sink) = progress {
                sink.report(source_id, &event);
            }
        };

        let mut stats = ChunkStats::default();

        let spans = match self.segment(source_id, text, &mut stats, &report) {
            Some(spans) => spans,
            None => {
                tracing::warn!(
                    source = %source_id,
                    "Every sentence backend failed, treating the document as one unit"
                );
                vec![SentenceSpan::new(0, text.len())]
            }
        };
        let spans = merge_blank_spans(text, spans);
        stats.sentence_count = spans.len();
        report(ChunkProgress::Segmented {
            backend: stats.backend,
            sentences: spans.len(),
        });

        let units = self.bound_units(source_id, text, &spans, &mut stats, &report);
        let chunks = pack(text, &units, &PackerConfig::from(&self.config));

        stats.chunk_count = chunks.len();
        if !chunks.is_empty() {
            let total: usize = chunks.iter().map(|c| c.char_count).sum();
            stats.average_chunk_chars = total as f64 / chunks.len() as f64;
        }
        for chunk in chunks.iter().filter(|c| c.byte_len() > DOWNSTREAM_PAYLOAD_CEILING_BYTES) {
            stats.payload_violations += 1;
            tracing::warn!(
                source = %source_id,
                index = chunk.index,
                bytes = chunk.byte_len(),
                ceiling = DOWNSTREAM_PAYLOAD_CEILING_BYTES,
                "Chunk exceeds downstream payload ceiling"
            );
        }
        report(ChunkProgress::Packed {
            chunks: stats.chunk_count,
            average_chars: stats.average_chunk_chars,
        });

        tracing::debug!(
            source = %source_id,
            backend = ?stats.backend,
            sentences = stats.sentence_count,
            chunks = stats.chunk_count,
            oversized = stats.oversized_sentences,
            truncated = stats.truncated_fragments,
            "Document chunked"
        );

        ChunkedDocument {
            source_id: source_id.to_string(),
            chunks,
            stats,
        }
    }

    /// Run the backend chain until one produces valid spans. Records the
    /// backend used and those that failed before it.
    fn segment(
        &self,
        source_id: &str,
        text: &str,
        stats: &mut ChunkStats,
        report: &dyn Fn(ChunkProgress),
    ) -> Option<Vec<SentenceSpan>> {
        for backend in &self.backends {
            let kind = backend.kind();
            report(ChunkProgress::Segmenting {
                backend: kind,
                chars: char_count(text),
            });
            let result = backend
                .segment(text)
                .and_then(|spans| validate_tiling(kind, text, &spans).map(|()| spans));
            match result {
                Ok(spans) => {
                    if !stats.degraded_from.is_empty() {
                        tracing::warn!(
                            source = %source_id,
                            backend = %kind,
                            failed = ?stats.degraded_from,
                            "Chunked with degraded sentence backend"
                        );
                    }
                    stats.backend = Some(kind);
                    return Some(spans);
                }
                Err(e) => {
                    tracing::warn!(source = %source_id, backend = %kind, "Sentence backend failed: {e}");
                    stats.degraded_from.push(kind);
                }
            }
        }
        None
    }

    /// Turn spans into packing units, splitting any span over the ceiling.
    fn bound_units(
        &self,
        source_id: &str,
        text: &str,
        spans: &[SentenceSpan],
        stats: &mut ChunkStats,
        report: &dyn Fn(ChunkProgress),
    ) -> Vec<Fragment> {
        let max = self.config.max_chunk_size;
        let mut units = Vec::with_capacity(spans.len());

        for (i, &span) in spans.iter().enumerate() {
            if i > 0 && i % PROGRESS_INTERVAL == 0 {
                report(ChunkProgress::Splitting {
                    done: i,
                    total: spans.len(),
                });
            }

            let chars = span.char_len(text);
            if chars <= max {
                units.push(Fragment {
                    span,
                    chars,
                    truncated: false,
                });
                continue;
            }

            stats.oversized_sentences += 1;
            let fragments = split_oversized(text, span, max);
            for fragment in fragments.iter().filter(|f| f.truncated) {
                stats.truncated_fragments += 1;
                tracing::warn!(
                    source = %source_id,
                    offset = fragment.span.start,
                    bytes = fragment.span.len(),
                    "Hard-cutting unbroken text at the chunk ceiling"
                );
            }
            units.extend(fragments);
        }

        if stats.oversized_sentences > 0 {
            tracing::debug!(
                source = %source_id,
                oversized = stats.oversized_sentences,
                units = units.len(),
                "Split oversized sentences"
            );
        }
        units
    }
}

/// Repair a config that breaks the packer's structural assumptions.
fn validated(config: ChunkingConfig) -> ChunkingConfig {
    if config.is_well_formed() {
        return config;
    }
    let (config, warnings) = config.repaired();
    for w in &warnings {
        tracing::warn!(key = w.key, "Chunking config value rejected: {}", w.message);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::chunker::error::ChunkingError;
    use crate::document::chunker::selector::BackendCapabilities;
    use std::sync::Mutex;

    struct Failing(BackendKind);

    impl SentenceBackend for Failing {
        fn kind(&self) -> BackendKind {
            self.0
        }

        fn segment(&self, _text: &str) -> Result<Vec<SentenceSpan>, ChunkingError> {
            Err(ChunkingError::Segmentation {
                backend: self.0,
                message: "model not loaded".to_string(),
            })
        }
    }

    /// Returns a single span that stops short of the end of the text.
    struct Gappy;

    impl SentenceBackend for Gappy {
        fn kind(&self) -> BackendKind {
            BackendKind::Statistical
        }

        fn segment(&self, text: &str) -> Result<Vec<SentenceSpan>, ChunkingError> {
            Ok(vec![SentenceSpan::new(0, text.len() / 2)])
        }
    }

    fn small_config() -> ChunkingConfig {
        ChunkingConfig {
            min_chunk_size: 40,
            max_chunk_size: 120,
            overlap_sentences: 0,
            ..ChunkingConfig::default()
        }
    }

    #[test]
    fn failing_backend_degrades_to_pattern() {
        let chunker = SemanticChunker::with_backends(
            small_config(),
            vec![
                Arc::new(Failing(BackendKind::Linguistic)),
                instantiate(BackendKind::Pattern).unwrap(),
            ],
        );
        let doc = Document::new("doc", "One sentence here. Another one there.");
        let out = chunker.chunk(&doc);
        assert_eq!(out.stats.backend, Some(BackendKind::Pattern));
        assert_eq!(out.stats.degraded_from, vec![BackendKind::Linguistic]);
        assert_eq!(out.stats.sentence_count, 2);
        assert_eq!(out.chunks.len(), 1);
    }

    #[test]
    fn non_tiling_output_counts_as_failure() {
        let chunker = SemanticChunker::with_backends(
            small_config(),
            vec![Arc::new(Gappy), instantiate(BackendKind::Pattern).unwrap()],
        );
        let out = chunker.chunk(&Document::new("doc", "First. Second."));
        assert_eq!(out.stats.backend, Some(BackendKind::Pattern));
        assert_eq!(out.stats.degraded_from, vec![BackendKind::Statistical]);
    }

    #[test]
    fn all_backends_failing_still_chunks() {
        let chunker = SemanticChunker::with_backends(
            small_config(),
            vec![Arc::new(Failing(BackendKind::Pattern))],
        );
        let text = "word ".repeat(100);
        let out = chunker.chunk(&Document::new("doc", &text));
        assert_eq!(out.stats.backend, None);
        assert_eq!(out.stats.sentence_count, 1);
        assert_eq!(out.stats.oversized_sentences, 1);
        assert!(out.chunks.len() >= 5);
        assert!(out.chunks.iter().all(|c| c.char_count <= 120));
    }

    #[test]
    fn selector_chain_starts_at_preference() {
        let caps = BackendCapabilities::all_available();
        let selector = BackendSelector::new(caps);
        let config = ChunkingConfig {
            backend: chatvid_core::BackendPreference::Pattern,
            ..ChunkingConfig::default()
        };
        let chunker = SemanticChunker::new(config, &selector);
        assert_eq!(chunker.backend_chain(), vec![BackendKind::Pattern]);
    }

    #[test]
    fn malformed_config_is_repaired() {
        let config = ChunkingConfig {
            min_chunk_size: 900,
            max_chunk_size: 400,
            ..ChunkingConfig::default()
        };
        let chunker = SemanticChunker::from_config(config);
        assert_eq!(chunker.config().min_chunk_size, 200);
        assert_eq!(chunker.config().max_chunk_size, 400);
    }

    #[test]
    fn invalid_target_keeps_configured_ceiling() {
        let config = ChunkingConfig {
            min_chunk_size: 50,
            max_chunk_size: 120,
            overlap_sentences: 0,
            target_chunk_size: Some(500),
            ..ChunkingConfig::default()
        };
        let chunker = SemanticChunker::with_backends(
            config,
            vec![instantiate(BackendKind::Pattern).unwrap()],
        );
        assert_eq!(chunker.config().min_chunk_size, 50);
        assert_eq!(chunker.config().max_chunk_size, 120);
        assert_eq!(chunker.config().target_chunk_size, None);

        let text = (0..40)
            .map(|i| format!("Sentence {i:02} has thirty chars."))
            .collect::<Vec<_>>()
            .join(" ");
        let out = chunker.chunk(&Document::new("doc", &text));
        assert!(out.chunks.len() > 1);
        assert!(out.chunks.iter().all(|c| c.char_count <= 120));
    }

    #[test]
    fn bad_fixed_overlap_leaves_semantic_sizes_alone() {
        let config = ChunkingConfig {
            min_chunk_size: 50,
            max_chunk_size: 120,
            fixed_chunk_size: 100,
            fixed_overlap: 100,
            ..ChunkingConfig::default()
        };
        let chunker = SemanticChunker::from_config(config);
        assert_eq!(chunker.config().min_chunk_size, 50);
        assert_eq!(chunker.config().max_chunk_size, 120);
        assert_eq!(chunker.config().fixed_chunk_size, 100);
        assert_eq!(chunker.config().fixed_overlap, 50);
    }

    #[test]
    fn truncation_is_counted() {
        let chunker = SemanticChunker::with_backends(
            small_config(),
            vec![instantiate(BackendKind::Pattern).unwrap()],
        );
        let text = format!("Short start. {} End.", "z".repeat(300));
        let out = chunker.chunk(&Document::new("doc", &text));
        assert_eq!(out.stats.oversized_sentences, 1);
        assert_eq!(out.stats.truncated_fragments, 2);
        assert!(out.chunks.iter().any(|c| c.truncated));
        assert!(out.chunks.iter().all(|c| c.char_count <= 120));
    }

    #[test]
    fn progress_only_for_large_documents() {
        let events = Mutex::new(Vec::new());
        let sink = |_: &str, p: &ChunkProgress| events.lock().unwrap().push(p.clone());

        let mut config = small_config();
        config.large_document_threshold = 1_000;
        let chunker = SemanticChunker::with_backends(
            config,
            vec![instantiate(BackendKind::Pattern).unwrap()],
        );

        chunker.chunk_with_progress(&Document::new("small", "Tiny. Text."), &sink);
        assert!(events.lock().unwrap().is_empty());

        let big = "A sentence of moderate length. ".repeat(50);
        chunker.chunk_with_progress(&Document::new("big", &big), &sink);
        let seen = events.lock().unwrap();
        assert!(matches!(seen.first(), Some(ChunkProgress::Segmenting { .. })));
        assert!(matches!(seen.last(), Some(ChunkProgress::Packed { .. })));
    }
}

//! Integration tests for the chunking engine's public API.
//!
//! Every compiled sentence backend is driven through the same inputs and
//! checked for the bound, coverage and termination properties.

use std::env;
use std::sync::Mutex;

use chatvid_core::{BackendPreference, ChunkingConfig, Config, Document};
use chatvid_ingest::document::chunker::{
    chunk_document, split_oversized, BackendCapabilities, BackendKind, BackendSelector,
    SemanticChunker, SentenceSpan,
};

// Env-based tests must run serially to avoid interfering with each other.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_chunking_env() {
    let keys = [
        "CHATVID_PROFILE",
        "MIN_CHUNK_SIZE",
        "MAX_CHUNK_SIZE",
        "OVERLAP_SENTENCES",
        "SENTENCE_BACKEND",
        "TEST_MAX_CHUNK_SIZE",
        "TEST_SENTENCE_BACKEND",
    ];
    for k in keys {
        env::remove_var(k);
    }
}

fn compiled_backends() -> Vec<BackendKind> {
    BackendKind::BY_PRIORITY
        .into_iter()
        .filter(|k| k.is_compiled())
        .collect()
}

fn chunker_for(kind: BackendKind, min: usize, max: usize, overlap: usize) -> SemanticChunker {
    let preference = match kind {
        BackendKind::Pattern => BackendPreference::Pattern,
        BackendKind::Statistical => BackendPreference::Statistical,
        BackendKind::Linguistic => BackendPreference::Linguistic,
    };
    let config = ChunkingConfig {
        min_chunk_size: min,
        max_chunk_size: max,
        overlap_sentences: overlap,
        backend: preference,
        ..ChunkingConfig::default()
    };
    SemanticChunker::new(config, &BackendSelector::new(BackendCapabilities::probe(&[])))
}

/// Inputs that have broken sentence chunkers before: runaway sentences,
/// unbroken tokens, ceiling-sized overlap, odd whitespace and abbreviations.
fn pathological_inputs() -> Vec<(&'static str, String)> {
    vec![
        ("long sentence", format!("{}.", "word ".repeat(1400).trim_end())),
        ("unbroken token", "x".repeat(7000)),
        (
            "ceiling overlap",
            format!("{}. {}. Then a short one. And another.", "a".repeat(698), "b".repeat(698)),
        ),
        (
            "abbreviations",
            "Dr. Smith met Mr. Jones at 5 p.m. on Main St. in the U.S. They talked. ".repeat(40),
        ),
        ("whitespace runs", "Line one.\n\n\n\n   Line two.\t\t\tLine three.\r\n".repeat(60)),
        ("multibyte", "Über straße café naïve résumé. 東京は大きい。 ".repeat(80)),
        ("no punctuation", "lorem ipsum dolor sit amet ".repeat(200)),
        ("punctuation only", "?!. ...!!! ??? ".repeat(100)),
    ]
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn every_chunk_respects_the_ceiling() {
    for kind in compiled_backends() {
        for max in [300, 700] {
            let chunker = chunker_for(kind, 100, max, 1);
            for (name, text) in pathological_inputs() {
                let out = chunker.chunk(&Document::new(name, text.as_str()));
                for chunk in &out.chunks {
                    assert!(
                        chunk.char_count <= max,
                        "{kind}/{name}: chunk {} has {} chars (max {max})",
                        chunk.index,
                        chunk.char_count
                    );
                    assert_eq!(chunk.char_count, chunk.text.chars().count());
                }
            }
        }
    }
}

#[test]
fn chunks_cover_every_visible_char() {
    for kind in compiled_backends() {
        let chunker = chunker_for(kind, 100, 400, 0);
        for (name, text) in pathological_inputs() {
            let out = chunker.chunk(&Document::new(name, text.as_str()));
            let rebuilt: String = out.chunks.iter().flat_map(|c| c.text.split_whitespace()).collect();
            let original: String = text.split_whitespace().collect();
            assert_eq!(rebuilt, original, "{kind}/{name}: text lost or duplicated");
        }
    }
}

#[test]
fn chunks_are_ordered_and_indexed() {
    for kind in compiled_backends() {
        let chunker = chunker_for(kind, 100, 300, 2);
        for (name, text) in pathological_inputs() {
            let out = chunker.chunk(&Document::new(name, text.as_str()));
            for (i, pair) in out.chunks.windows(2).enumerate() {
                assert_eq!(pair[0].index, i);
                assert!(pair[0].start < pair[1].start, "{kind}/{name}: chunks out of order");
                assert!(pair[0].end <= pair[1].end);
            }
            assert_eq!(out.stats.chunk_count, out.chunks.len());
        }
    }
}

#[test]
fn maximal_overlap_still_terminates() {
    // Five overlap sentences whose combined size is close to the ceiling.
    let text = (0..200)
        .map(|i| format!("Sentence {i:03} {}.", "y".repeat(50)))
        .collect::<Vec<_>>()
        .join(" ");
    for kind in compiled_backends() {
        let out = chunker_for(kind, 100, 300, 5).chunk(&Document::new("overlap", text.as_str()));
        assert!(!out.chunks.is_empty());
        assert!(out.chunks.len() < 200 * 5);
        let last = format!("Sentence 199 {}.", "y".repeat(50));
        assert!(out.chunks.last().unwrap().text.ends_with(&last));
    }
}

#[test]
fn splitter_output_reassembles_the_sentence() {
    let sentence = format!(
        "{}; {}: {}, {}",
        "alpha ".repeat(90),
        "beta ".repeat(90),
        "gamma ".repeat(90),
        "z".repeat(1500)
    );
    let span = SentenceSpan::new(0, sentence.len());
    let fragments = split_oversized(&sentence, span, 700);

    let rebuilt: String = fragments.iter().map(|f| f.span.as_str(&sentence)).collect();
    assert_eq!(rebuilt, sentence);
    assert!(fragments.iter().all(|f| f.chars <= 700));
    assert!(fragments.len() >= sentence.len() / 700);
    assert!(fragments.iter().any(|f| f.truncated));
}

// ── Selection ───────────────────────────────────────────────────────

#[test]
fn auto_uses_the_best_compiled_backend() {
    let selector = BackendSelector::new(BackendCapabilities::probe(&[]));
    let best = compiled_backends()[0];
    assert_eq!(selector.resolve(BackendPreference::Auto), best);

    let config = ChunkingConfig {
        backend: BackendPreference::Auto,
        ..ChunkingConfig::default()
    };
    let out = SemanticChunker::new(config, &selector).chunk(&Document::new("auto", "One. Two."));
    assert_eq!(out.stats.backend, Some(best));
}

#[test]
fn disabled_backends_are_skipped() {
    let selector = BackendSelector::new(BackendCapabilities::probe(&[
        BackendPreference::Linguistic,
        BackendPreference::Statistical,
    ]));
    assert_eq!(selector.resolve(BackendPreference::Auto), BackendKind::Pattern);
    assert_eq!(
        selector.fallback_chain(BackendPreference::Linguistic),
        vec![BackendKind::Pattern]
    );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn profiled_env_config_drives_chunking() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_chunking_env();

    env::set_var("CHATVID_PROFILE", "test");
    env::set_var("MAX_CHUNK_SIZE", "900");
    env::set_var("TEST_MAX_CHUNK_SIZE", "400");
    env::set_var("MIN_CHUNK_SIZE", "120");
    env::set_var("TEST_SENTENCE_BACKEND", "regex");

    let config = Config::from_env();
    assert_eq!(config.profile, "TEST");
    assert_eq!(config.chunking.max_chunk_size, 400);
    assert_eq!(config.chunking.min_chunk_size, 120);
    assert_eq!(config.chunking.backend, BackendPreference::Pattern);

    let text = "A short sentence that repeats. ".repeat(40);
    let out = chunk_document(&Document::new("env", text), &config.chunking);
    assert!(out.chunks.iter().all(|c| c.char_count <= 400));

    clear_chunking_env();
}

#[test]
fn out_of_range_env_values_fall_back() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_chunking_env();

    env::set_var("MAX_CHUNK_SIZE", "50000");
    env::set_var("OVERLAP_SENTENCES", "many");
    env::set_var("SENTENCE_BACKEND", "quantum");

    let config = Config::from_env();
    assert_eq!(config.chunking.max_chunk_size, 700);
    assert_eq!(config.chunking.overlap_sentences, 1);
    assert_eq!(config.chunking.backend, BackendPreference::Pattern);

    clear_chunking_env();
}

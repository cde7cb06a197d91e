//! chunk-file: chunk extracted text files and print JSON lines.
//!
//! Each output line is one chunk: `{source, index, text, char_count, ...}`.
//! Configuration comes from the environment (`.env` honored, profile from
//! `CHATVID_PROFILE`), with command-line flags taking precedence.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use chatvid_core::config::load_dotenv;
use chatvid_core::{BackendPreference, ChunkingStrategy, Config, Document, PageText};
use chatvid_ingest::document::chunker::{
    chunk_documents, chunk_pages, BackendSelector, Chunk, ChunkedDocument,
};

/// Page break emitted by PDF text extractors.
const FORM_FEED: char = '\u{c}';

// ── CLI ─────────────────────────────────────────────────────────────

/// Split extracted document text into bounded, sentence-aligned chunks.
#[derive(Parser, Debug)]
#[command(name = "chunk-file", version, about)]
struct Cli {
    /// Text files to chunk.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Chunking strategy (semantic | fixed).
    #[arg(long)]
    strategy: Option<ChunkingStrategy>,

    /// Sentence backend (auto | pattern | statistical | linguistic).
    #[arg(long)]
    backend: Option<BackendPreference>,

    #[arg(long)]
    min_chunk_size: Option<usize>,

    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Sentences repeated at the start of the next chunk.
    #[arg(long)]
    overlap: Option<usize>,

    /// Prefix each document with `[Source: <file name>]`.
    #[arg(long)]
    attribute_source: bool,

    /// Treat form feeds as page breaks and report page ranges.
    #[arg(long)]
    pages: bool,

    /// Print per-document statistics to stderr.
    #[arg(long)]
    stats: bool,
}

#[derive(Serialize)]
struct ChunkLine<'a> {
    source: &'a str,
    #[serde(flatten)]
    chunk: &'a Chunk,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    let chunking = &mut config.chunking;
    if let Some(strategy) = cli.strategy {
        chunking.strategy = strategy;
    }
    if let Some(backend) = cli.backend {
        chunking.backend = backend;
    }
    if let Some(min) = cli.min_chunk_size {
        chunking.min_chunk_size = min;
    }
    if let Some(max) = cli.max_chunk_size {
        chunking.max_chunk_size = max;
    }
    if let Some(overlap) = cli.overlap {
        chunking.overlap_sentences = overlap;
    }
    chunking.attribute_source |= cli.attribute_source;

    let (chunking, warnings) = config.chunking.clone().sanitized();
    for w in &warnings {
        tracing::warn!(key = w.key, "Config value rejected, using default: {}", w.message);
    }
    config.chunking = chunking;
    config.log_summary();

    let selector = BackendSelector::from_process(&config.chunking.disabled_backends);
    info!(
        backend = %selector.resolve(config.chunking.backend),
        chain = ?selector.fallback_chain(config.chunking.backend),
        "Sentence backend resolved"
    );

    let mut docs = Vec::with_capacity(cli.paths.len());
    for path in &cli.paths {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let source_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        docs.push(Document::new(source_id, String::from_utf8_lossy(&bytes)));
    }

    let results: Vec<ChunkedDocument> = if cli.pages {
        docs.iter()
            .map(|doc| {
                let pages: Vec<PageText> = doc
                    .text
                    .split(FORM_FEED)
                    .enumerate()
                    .map(|(i, text)| PageText::new(i + 1, text))
                    .collect();
                chunk_pages(&pages, &doc.source_id, &config.chunking)
            })
            .collect()
    } else {
        chunk_documents(&docs, &config.chunking)
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for result in &results {
        for chunk in &result.chunks {
            let line = ChunkLine {
                source: &result.source_id,
                chunk,
            };
            serde_json::to_writer(&mut out, &line).context("writing chunk")?;
            out.write_all(b"\n")?;
        }
        if cli.stats {
            eprintln!(
                "{}: {}",
                result.source_id,
                serde_json::to_string(&result.stats).context("encoding stats")?
            );
        }
    }
    out.flush()?;

    let total: usize = results.iter().map(|r| r.chunks.len()).sum();
    info!(documents = results.len(), chunks = total, "Done");
    Ok(())
}

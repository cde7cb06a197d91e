use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Byte capacity of one encoded unit in the downstream carrier.
/// No chunk may exceed this once UTF-8 encoded.
pub const DOWNSTREAM_PAYLOAD_CEILING_BYTES: usize = 2953;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub chunking: ChunkingConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CHATVID_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CHATVID_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            chunking: ChunkingConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        self.chunking.log_summary();
    }
}

// ── Enumerated options ────────────────────────────────────────

/// Which chunker handles a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    #[default]
    Semantic,
    /// Legacy fixed-width windows.
    Fixed,
}

impl FromStr for ChunkingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "fixed" => Ok(Self::Fixed),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => f.write_str("semantic"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

/// Configured sentence backend. `Auto` lets availability and rank decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    Auto,
    #[default]
    Pattern,
    Statistical,
    Linguistic,
}

impl FromStr for BackendPreference {
    type Err = ConfigError;

    /// Accepts the historical backend names (`regex`, `nltk`, `spacy`) as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "pattern" | "regex" => Ok(Self::Pattern),
            "statistical" | "punkt" | "nltk" => Ok(Self::Statistical),
            "linguistic" | "uax29" | "spacy" => Ok(Self::Linguistic),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Pattern => "pattern",
            Self::Statistical => "statistical",
            Self::Linguistic => "linguistic",
        };
        f.write_str(name)
    }
}

/// What the packer does with overlap sentences that would block progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Clear the overlap seed entirely.
    #[default]
    Drop,
    /// Keep the longest run of trailing overlap sentences that still fits.
    Shrink,
}

impl FromStr for OverlapPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" | "clear" => Ok(Self::Drop),
            "shrink" => Ok(Self::Shrink),
            other => Err(ConfigError::UnknownOverlapPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => f.write_str("drop"),
            Self::Shrink => f.write_str("shrink"),
        }
    }
}

// ── Warnings ──────────────────────────────────────────────────

/// A rejected configuration value that was replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

// ── Chunking ──────────────────────────────────────────────────

const DEFAULT_MIN_CHUNK_SIZE: usize = 300;
const DEFAULT_MAX_CHUNK_SIZE: usize = 700;
const DEFAULT_OVERLAP_SENTENCES: usize = 1;
const DEFAULT_FIXED_CHUNK_SIZE: usize = 500;
const DEFAULT_FIXED_OVERLAP: usize = 50;
const DEFAULT_LARGE_DOCUMENT_THRESHOLD: usize = 100_000;

const MIN_CHUNK_SIZE_RANGE: RangeInclusive<usize> = 100..=1000;
const MAX_CHUNK_SIZE_RANGE: RangeInclusive<usize> = 300..=2000;
const OVERLAP_SENTENCES_RANGE: RangeInclusive<usize> = 0..=5;
const FIXED_CHUNK_SIZE_RANGE: RangeInclusive<usize> = 100..=1000;
const FIXED_OVERLAP_RANGE: RangeInclusive<usize> = 0..=200;

/// Worst-case UTF-8 width of one char.
const MAX_UTF8_WIDTH: usize = 4;

/// Configuration for the chunking engine. Sizes are counted in chars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub strategy: ChunkingStrategy,
    /// Target lower bound per chunk (default: 300). The last chunk may be smaller.
    pub min_chunk_size: usize,
    /// Hard upper bound per chunk (default: 700).
    pub max_chunk_size: usize,
    /// Emit as soon as a chunk reaches this size (default: unset).
    pub target_chunk_size: Option<usize>,
    /// Sentences repeated at the start of the next chunk (default: 1).
    pub overlap_sentences: usize,
    pub overlap_policy: OverlapPolicy,
    pub backend: BackendPreference,
    /// Window size for the fixed strategy (default: 500).
    pub fixed_chunk_size: usize,
    /// Window overlap for the fixed strategy (default: 50).
    pub fixed_overlap: usize,
    /// Prepend `[Source: <id>]` to the text before chunking.
    pub attribute_source: bool,
    /// Documents longer than this (in chars) get progress reporting.
    pub large_document_threshold: usize,
    /// Backends treated as unavailable by the availability probe.
    pub disabled_backends: Vec<BackendPreference>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Semantic,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            target_chunk_size: None,
            overlap_sentences: DEFAULT_OVERLAP_SENTENCES,
            overlap_policy: OverlapPolicy::Drop,
            backend: BackendPreference::Pattern,
            fixed_chunk_size: DEFAULT_FIXED_CHUNK_SIZE,
            fixed_overlap: DEFAULT_FIXED_OVERLAP,
            attribute_source: false,
            large_document_threshold: DEFAULT_LARGE_DOCUMENT_THRESHOLD,
            disabled_backends: Vec::new(),
        }
    }
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        let (config, warnings) = Self::from_lookup(|key| profiled_env_opt(p, key));
        for w in &warnings {
            tracing::warn!(key = w.key, "Config value rejected, using default: {}", w.message);
        }
        config
    }

    /// Build from an arbitrary key lookup, then sanitize.
    ///
    /// Unparseable and out-of-range values fall back to their defaults; every
    /// substitution is reported in the returned warnings.
    pub fn from_lookup<F>(lookup: F) -> (Self, Vec<ConfigWarning>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let defaults = Self::default();

        let strategy = parse_or(&lookup, "CHUNKING_STRATEGY", defaults.strategy, &mut warnings);
        let backend = parse_or(&lookup, "SENTENCE_BACKEND", defaults.backend, &mut warnings);
        let overlap_policy =
            parse_or(&lookup, "OVERLAP_POLICY", defaults.overlap_policy, &mut warnings);
        let min_chunk_size =
            parse_or(&lookup, "MIN_CHUNK_SIZE", defaults.min_chunk_size, &mut warnings);
        let max_chunk_size =
            parse_or(&lookup, "MAX_CHUNK_SIZE", defaults.max_chunk_size, &mut warnings);
        let overlap_sentences =
            parse_or(&lookup, "OVERLAP_SENTENCES", defaults.overlap_sentences, &mut warnings);
        let fixed_chunk_size =
            parse_or(&lookup, "CHUNK_SIZE", defaults.fixed_chunk_size, &mut warnings);
        let fixed_overlap = parse_or(&lookup, "CHUNK_OVERLAP", defaults.fixed_overlap, &mut warnings);
        let large_document_threshold = parse_or(
            &lookup,
            "LARGE_DOCUMENT_THRESHOLD",
            defaults.large_document_threshold,
            &mut warnings,
        );
        let target_chunk_size = lookup("TARGET_CHUNK_SIZE").and_then(|raw| {
            match raw.trim().parse::<usize>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warnings.push(ConfigWarning::new(
                        "TARGET_CHUNK_SIZE",
                        format!("'{raw}' is not a number, target disabled"),
                    ));
                    None
                }
            }
        });
        let attribute_source = lookup("ENABLE_SOURCE_ATTRIBUTION")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(defaults.attribute_source);

        let mut disabled_backends = Vec::new();
        if let Some(raw) = lookup("DISABLED_SENTENCE_BACKENDS") {
            for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match name.parse::<BackendPreference>() {
                    Ok(BackendPreference::Auto) | Err(_) => warnings.push(ConfigWarning::new(
                        "DISABLED_SENTENCE_BACKENDS",
                        format!("ignoring '{name}'"),
                    )),
                    Ok(kind) => disabled_backends.push(kind),
                }
            }
        }

        let config = Self {
            strategy,
            min_chunk_size,
            max_chunk_size,
            target_chunk_size,
            overlap_sentences,
            overlap_policy,
            backend,
            fixed_chunk_size,
            fixed_overlap,
            attribute_source,
            large_document_threshold,
            disabled_backends,
        };
        let (config, mut range_warnings) = config.sanitized();
        warnings.append(&mut range_warnings);
        (config, warnings)
    }

    /// Whether the structural invariants the chunkers rely on hold:
    /// positive sizes, `min < max`, fixed overlap below the window size.
    pub fn is_well_formed(&self) -> bool {
        self.min_chunk_size > 0
            && self.min_chunk_size < self.max_chunk_size
            && self.fixed_chunk_size > 0
            && self.fixed_overlap < self.fixed_chunk_size
            && self
                .target_chunk_size
                .map_or(true, |t| t > self.min_chunk_size && t <= self.max_chunk_size)
    }

    /// Fix only the fields that break [`is_well_formed`](Self::is_well_formed),
    /// leaving every other value as given. A valid `max_chunk_size` is never
    /// changed, so the ceiling callers configure is the one chunks obey.
    pub fn repaired(mut self) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        if self.min_chunk_size == 0 || self.min_chunk_size >= self.max_chunk_size {
            let (min, max) = if self.max_chunk_size > 1 {
                (DEFAULT_MIN_CHUNK_SIZE.min(self.max_chunk_size / 2), self.max_chunk_size)
            } else {
                (DEFAULT_MIN_CHUNK_SIZE, DEFAULT_MAX_CHUNK_SIZE)
            };
            warnings.push(ConfigWarning::new(
                "MIN_CHUNK_SIZE",
                format!(
                    "{}-{} is not a valid size range, using {min}-{max}",
                    self.min_chunk_size, self.max_chunk_size
                ),
            ));
            self.min_chunk_size = min;
            self.max_chunk_size = max;
        }
        if let Some(target) = self.target_chunk_size {
            if target <= self.min_chunk_size || target > self.max_chunk_size {
                warnings.push(ConfigWarning::new(
                    "TARGET_CHUNK_SIZE",
                    format!(
                        "{target} outside ({}, {}], target disabled",
                        self.min_chunk_size, self.max_chunk_size
                    ),
                ));
                self.target_chunk_size = None;
            }
        }
        if self.fixed_chunk_size == 0 {
            warnings.push(ConfigWarning::new(
                "CHUNK_SIZE",
                format!("must be positive, using {DEFAULT_FIXED_CHUNK_SIZE}"),
            ));
            self.fixed_chunk_size = DEFAULT_FIXED_CHUNK_SIZE;
        }
        if self.fixed_overlap >= self.fixed_chunk_size {
            let overlap = DEFAULT_FIXED_OVERLAP.min(self.fixed_chunk_size / 2);
            warnings.push(ConfigWarning::new(
                "CHUNK_OVERLAP",
                format!(
                    "{} must be below CHUNK_SIZE ({}), using {overlap}",
                    self.fixed_overlap, self.fixed_chunk_size
                ),
            ));
            self.fixed_overlap = overlap;
        }

        (self, warnings)
    }

    /// Replace out-of-range values with defaults.
    pub fn sanitized(mut self) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        clamp_to_range(
            &mut self.min_chunk_size,
            "MIN_CHUNK_SIZE",
            MIN_CHUNK_SIZE_RANGE,
            DEFAULT_MIN_CHUNK_SIZE,
            &mut warnings,
        );
        clamp_to_range(
            &mut self.max_chunk_size,
            "MAX_CHUNK_SIZE",
            MAX_CHUNK_SIZE_RANGE,
            DEFAULT_MAX_CHUNK_SIZE,
            &mut warnings,
        );
        if self.min_chunk_size >= self.max_chunk_size {
            warnings.push(ConfigWarning::new(
                "MIN_CHUNK_SIZE",
                format!(
                    "min ({}) must be below max ({}), using {}-{}",
                    self.min_chunk_size,
                    self.max_chunk_size,
                    DEFAULT_MIN_CHUNK_SIZE,
                    DEFAULT_MAX_CHUNK_SIZE
                ),
            ));
            self.min_chunk_size = DEFAULT_MIN_CHUNK_SIZE;
            self.max_chunk_size = DEFAULT_MAX_CHUNK_SIZE;
        }
        if let Some(target) = self.target_chunk_size {
            if target <= self.min_chunk_size || target > self.max_chunk_size {
                warnings.push(ConfigWarning::new(
                    "TARGET_CHUNK_SIZE",
                    format!(
                        "{target} outside ({}, {}], target disabled",
                        self.min_chunk_size, self.max_chunk_size
                    ),
                ));
                self.target_chunk_size = None;
            }
        }
        clamp_to_range(
            &mut self.overlap_sentences,
            "OVERLAP_SENTENCES",
            OVERLAP_SENTENCES_RANGE,
            DEFAULT_OVERLAP_SENTENCES,
            &mut warnings,
        );
        clamp_to_range(
            &mut self.fixed_chunk_size,
            "CHUNK_SIZE",
            FIXED_CHUNK_SIZE_RANGE,
            DEFAULT_FIXED_CHUNK_SIZE,
            &mut warnings,
        );
        clamp_to_range(
            &mut self.fixed_overlap,
            "CHUNK_OVERLAP",
            FIXED_OVERLAP_RANGE,
            DEFAULT_FIXED_OVERLAP,
            &mut warnings,
        );
        if self.fixed_overlap >= self.fixed_chunk_size {
            warnings.push(ConfigWarning::new(
                "CHUNK_OVERLAP",
                format!(
                    "{} must be below CHUNK_SIZE ({}), using {}",
                    self.fixed_overlap, self.fixed_chunk_size, DEFAULT_FIXED_OVERLAP
                ),
            ));
            self.fixed_overlap = DEFAULT_FIXED_OVERLAP;
        }
        if self.large_document_threshold == 0 {
            warnings.push(ConfigWarning::new(
                "LARGE_DOCUMENT_THRESHOLD",
                format!("must be positive, using {DEFAULT_LARGE_DOCUMENT_THRESHOLD}"),
            ));
            self.large_document_threshold = DEFAULT_LARGE_DOCUMENT_THRESHOLD;
        }
        if self.max_chunk_size * MAX_UTF8_WIDTH > DOWNSTREAM_PAYLOAD_CEILING_BYTES {
            // Kept as configured; the chunker reports any chunk that actually overflows.
            warnings.push(ConfigWarning::new(
                "MAX_CHUNK_SIZE",
                format!(
                    "{} chars may exceed the {} byte payload ceiling for multibyte text",
                    self.max_chunk_size, DOWNSTREAM_PAYLOAD_CEILING_BYTES
                ),
            ));
        }

        (self, warnings)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "  chunking:    strategy={}, size={}-{}, overlap={} ({}), backend={}",
            self.strategy,
            self.min_chunk_size,
            self.max_chunk_size,
            self.overlap_sentences,
            self.overlap_policy,
            self.backend
        );
        if self.strategy == ChunkingStrategy::Fixed {
            tracing::info!(
                "  fixed:       chunk_size={}, overlap={}",
                self.fixed_chunk_size,
                self.fixed_overlap
            );
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T, warnings: &mut Vec<ConfigWarning>) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warnings.push(ConfigWarning::new(
                    key,
                    format!("could not parse '{raw}', using {default}"),
                ));
                default
            }
        },
    }
}

fn clamp_to_range(
    value: &mut usize,
    key: &'static str,
    range: RangeInclusive<usize>,
    default: usize,
    warnings: &mut Vec<ConfigWarning>,
) {
    if !range.contains(value) {
        warnings.push(ConfigWarning::new(
            key,
            format!(
                "{} outside {}-{}, using {}",
                value,
                range.start(),
                range.end(),
                default
            ),
        ));
        *value = default;
    }
}

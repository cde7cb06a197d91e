use thiserror::Error;

/// Errors raised while parsing configuration values.
///
/// Loading never fails on these: the loader substitutes the default and
/// records a [`crate::config::ConfigWarning`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown chunking strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown sentence backend: {0}")]
    UnknownBackend(String),

    #[error("Unknown overlap policy: {0}")]
    UnknownOverlapPolicy(String),
}

pub mod config;
pub mod document;
pub mod error;

pub use config::{
    BackendPreference, ChunkingConfig, ChunkingStrategy, Config, ConfigWarning, OverlapPolicy,
};
pub use document::*;
pub use error::*;

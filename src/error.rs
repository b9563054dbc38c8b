// src/error.rs
//! Library error types. Application edges (bootstrap, binaries) wrap these in `anyhow`.

use std::time::Duration;

use thiserror::Error;

/// Rejected configuration. Raised once, when a config is built or loaded; values are
/// never silently clamped into range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse digest config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("`{field}` must be at least 1")]
    Zero { field: &'static str },

    #[error("`{field}` = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("segmenter bounds are inverted: min_chars {min} >= max_chars {max}")]
    InvertedBounds { min: usize, max: usize },

    #[error("`{field}` contains a blank entry")]
    BlankToken { field: &'static str },

    #[error("`{field}` could not be compiled into a pattern: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("scoring preset `custom` requires a [scoring.weights] table")]
    MissingCustomWeights,

    #[error("all scoring weights are zero; at least one signal must contribute")]
    ZeroWeights,

    #[error("embedder `tei` requires `embedder.url`")]
    MissingEmbedderUrl,

    #[error("invalid value for env var {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

/// Failure at the embedding-provider boundary.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding service returned status {0}")]
    Status(u16),

    #[error("could not decode embedding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("embedding service returned {got} vectors for {expected} inputs")]
    Mismatch { expected: usize, got: usize },

    #[error("embedding has dimension {got}, expected {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("embedding timed out after {0:?}")]
    Timeout(Duration),
}

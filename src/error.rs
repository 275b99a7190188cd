//! Top-level error types for relaybot.

use std::path::PathBuf;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Understand(#[from] UnderstandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Media download and encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to download media from {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("media file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read media file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Processed-state persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to persist processed state to {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Generative-media understanding API errors.
#[derive(Debug, thiserror::Error)]
pub enum UnderstandError {
    #[error("media payload too large for the understanding API: {bytes} bytes (limit {limit})")]
    PayloadTooLarge { bytes: usize, limit: usize },

    #[error("understanding API request failed: {0}")]
    Request(String),

    #[error("understanding API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed understanding API response: {0}")]
    MalformedResponse(String),
}

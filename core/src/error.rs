//! Error types for lexitree-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// B-tree branching factor below the minimum valid value.
    #[error("min_degree must be at least 2, got {0}")]
    InvalidMinDegree(usize),

    /// Corpus file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Corpus file extension is neither json nor jsonl.
    #[error("unsupported corpus format: {0}")]
    UnsupportedCorpus(String),
}

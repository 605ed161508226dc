use std::path::PathBuf;

use thiserror::Error;

use crate::models::Source;

/// Failures reading or writing persisted collections and the ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} contains invalid JSON: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Malformed fetch-collaborator output. Nothing is merged when one of these is returned.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid JSON string provided: {0}")]
    InvalidJson(String),

    #[error("Content must be an object with a 'results' key containing a list")]
    WrongShape,

    #[error("Entry {index} is malformed: {reason}")]
    Entry { index: usize, reason: String },

    #[error("Entry {index} is tagged '{found}' but the batch is for '{expected}'")]
    SourceMismatch {
        index: usize,
        expected: Source,
        found: Source,
    },

    #[error("Fetch collaborator reported an error: {0}")]
    Collaborator(String),
}

#[derive(Debug, Error)]
pub enum CurateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("min_usefulness_score must be between 0 and 100, got {0}")]
    InvalidThreshold(i64),

    #[error("Invalid date '{0}'. Expected DD-MM-YYYY")]
    InvalidDate(String),

    #[error("Unknown source '{0}'. Must be one of arxiv, blog, gscholar")]
    UnknownSource(String),

    #[error("Unknown selection mode '{0}'. Must be 'date' or 'score'")]
    UnknownMode(String),

    #[error("Post content rejected: {0}")]
    InvalidContent(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),
}

pub type Result<T> = std::result::Result<T, CurateError>;

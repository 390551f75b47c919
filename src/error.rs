//! Error type shared by the stores and the interactive operations.
//!
//! Batch pipelines accumulate counts in report structs instead; a single bad
//! record never aborts a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Update/delete/hide aimed at an id that does not exist.
    #[error("place {0} not found")]
    NotFound(u64),

    /// Malformed input on an interactive operation, e.g. a create without a name.
    #[error("invalid place data: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] sled::Error),

    /// A persisted row that no longer deserializes into its record type.
    #[error("corrupt stored row: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

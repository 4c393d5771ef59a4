//! Error taxonomy for the pipeline.
//!
//! Three kinds, with distinct propagation policies:
//! - [`Error::Extraction`] and [`Error::Configuration`] abort the triggering
//!   stage immediately, with no partial state change.
//! - [`Error::Generation`] aborts only the current run of the current stage;
//!   state committed by earlier runs is untouched, so the caller can retry.
//!
//! No error is fatal to the session. The core performs no automatic retry.

use thiserror::Error;

/// Failure of an external generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Pipeline-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// Document text could not be read (corrupt file, unsupported encoding).
    #[error("text extraction failed: {0}")]
    Extraction(String),
    /// The external generation call failed mid-run.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    /// Invalid chunk/batch size, threshold, or credentials.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

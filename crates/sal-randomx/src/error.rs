//! RandomX engine errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RandomxError {
    /// Cache/dataset not initialized for the requested mode.
    #[error("mining session is not ready (seed not installed)")]
    NotReady,

    /// A stop request interrupted initialization or mining.
    #[error("operation cancelled")]
    Cancelled,

    /// Malformed mining job.
    #[error("invalid mining job: {0}")]
    BadJob(&'static str),
}

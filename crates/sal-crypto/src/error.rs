//! Error type for the crypto layer.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Scalar bytes not in [0, L).
    #[error("non-canonical scalar encoding")]
    InvalidScalar,

    /// Point bytes not on the curve, non-canonical, or outside the
    /// prime-order subgroup where membership is required.
    #[error("invalid point encoding: {0}")]
    InvalidPoint(&'static str),

    /// A proof or signature failed structural validation before any
    /// cryptographic check ran.
    #[error("malformed proof: {0}")]
    MalformedProof(&'static str),

    /// A proof or signature failed cryptographic verification.
    #[error("proof verification failed: {0}")]
    InvalidProof(&'static str),

    /// Prover-side input rejected (amount range, aggregation count, ...).
    #[error("invalid prover input: {0}")]
    InvalidInput(&'static str),
}

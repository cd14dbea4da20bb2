//! Transaction-layer errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    /// Truncated input, bad varint, unknown tag, non-canonical key.
    #[error("malformed transaction encoding at offset {offset}: {what}")]
    Encoding { offset: usize, what: String },

    /// A proof or ring signature failed verification.
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// Structurally valid but violates protocol rules (type/version
    /// mismatch, bad conversion pair, slippage exceeded, ...).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Builder preconditions not met (no inputs, amount overflow, ...).
    #[error("cannot build transaction: {0}")]
    Build(String),

    /// Decoy selection could not produce a ring.
    #[error("decoy selection failed: {0}")]
    DecoySelection(String),

    #[error(transparent)]
    Crypto(#[from] sal_crypto::CryptoError),
}

impl TxError {
    pub fn encoding(offset: usize, what: impl Into<String>) -> Self {
        TxError::Encoding { offset, what: what.into() }
    }
}

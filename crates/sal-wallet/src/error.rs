//! Wallet-layer errors.

use thiserror::Error;

/// Errors bubbled verbatim from the injected store.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;
/// Errors bubbled verbatim from the injected chain source.
pub type ChainError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Fatal for the current sync iteration.
    #[error("store error: {0}")]
    Store(#[source] StoreError),

    /// Daemon unreachable or reply malformed.
    #[error("chain source error: {0}")]
    Chain(#[source] ChainError),

    /// Block hash mismatch at a known height; triggers rollback.
    #[error("chain inconsistency at height {height}: {what}")]
    ChainInconsistency { height: u64, what: String },

    #[error("transaction error: {0}")]
    Tx(#[from] sal_tx::TxError),

    #[error(transparent)]
    Crypto(#[from] sal_crypto::CryptoError),

    /// Stop flag observed; the operation unwound cleanly.
    #[error("operation cancelled")]
    Cancelled,
}

//! Wallet core: key hierarchy, output scanning, and the sync engine.
//!
//! Network and persistence are injected through the [`chain::ChainSource`]
//! and [`store::WalletStore`] traits; the core stays synchronous and
//! holds no sockets, files, or locks across daemon calls.

pub mod chain;
pub mod error;
pub mod keys;
pub mod scanner;
pub mod spend;
pub mod store;
pub mod sync;

pub use chain::{BlockOutputIndices, ChainSource, FetchedBlock};
pub use error::WalletError;
pub use keys::{WalletKeys, WalletType};
pub use scanner::{ScanContext, TxContext};
pub use store::{Balance, MemoryStore, OutputFilter, WalletOutput, WalletStore};
pub use sync::{NullSyncObserver, SyncEngine, SyncObserver};

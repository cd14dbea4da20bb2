//! Salvium transaction layer: typed model, consensus binary codec,
//! extra-field handling, hashing, decoy selection, fee rules, CARROT
//! enote construction, and RCT build/sign/verify.

pub mod builder;
pub mod carrot;
pub mod codec;
pub mod decoy;
pub mod error;
pub mod extra;
pub mod fee;
pub mod hashing;
pub mod types;
pub mod verify;

pub use builder::{build_transaction, BuildOptions, BuiltTransaction, Destination, InputSecret, SpendInput};
pub use codec::{parse_block, parse_transaction, serialize_block, serialize_transaction};
pub use error::TxError;
pub use hashing::{signature_message, tx_hash, tx_prefix_hash};
pub use types::{Block, BlockHeader, Transaction, TxInput, TxOutTarget, TxOutput, TxPrefix};
pub use verify::{verify_rct, verify_semantics, RingMembers};

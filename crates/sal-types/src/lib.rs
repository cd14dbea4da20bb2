//! Protocol-level constants and pure consensus helpers shared by the
//! Salvium wallet core: wire tags, asset types, fee rules, and the
//! 256-bit difficulty comparison used by the miner.

pub mod constants;
pub mod consensus;
pub mod difficulty;

pub use constants::{tx_type, rct_type, txin_tag, txout_tag, AssetType, Network};
pub use difficulty::hash_meets_difficulty;

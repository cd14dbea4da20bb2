//! The injected chain-source interface.
//!
//! Implementations wrap a daemon RPC client (out of scope here); calls
//! may block arbitrarily long, so the sync engine never holds locks
//! across them.

use sal_tx::Block;

pub use crate::error::ChainError;

#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub height: u64,
}

#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub height: u64,
    pub hash: [u8; 32],
    pub timestamp: u64,
}

/// Global output indices for every transaction in a block, in block
/// order: miner tx, protocol tx, then the listed tx hashes.
#[derive(Debug, Clone, Default)]
pub struct BlockOutputIndices {
    pub miner: Vec<u64>,
    pub protocol: Vec<u64>,
    pub txs: Vec<Vec<u64>>,
}

/// A fetched block plus its chain hash (the daemon computes PoW-related
/// hashing; the wallet treats it as opaque identity).
pub struct FetchedBlock {
    pub height: u64,
    pub hash: [u8; 32],
    pub block: Block,
    pub output_indices: BlockOutputIndices,
}

/// Ring member resolved from a global output index.
#[derive(Debug, Clone)]
pub struct RingMemberInfo {
    pub global_index: u64,
    pub key: [u8; 32],
    pub commitment: [u8; 32],
    pub height: u64,
}

pub trait ChainSource {
    fn get_info(&self) -> Result<ChainInfo, ChainError>;
    fn get_block_headers(&self, start: u64, end: u64) -> Result<Vec<HeaderInfo>, ChainError>;
    fn get_block(&self, height: u64) -> Result<FetchedBlock, ChainError>;
    /// Raw tx blobs for the given hashes, same order.
    fn get_transactions(&self, hashes: &[[u8; 32]]) -> Result<Vec<Vec<u8>>, ChainError>;
    fn get_mempool(&self) -> Result<Vec<Vec<u8>>, ChainError>;
    /// Cumulative RCT output counts per block, for decoy selection.
    fn get_output_distribution(&self) -> Result<Vec<u64>, ChainError>;
    /// Resolve ring members from global indices.
    fn get_outputs(&self, indices: &[u64]) -> Result<Vec<RingMemberInfo>, ChainError>;
}

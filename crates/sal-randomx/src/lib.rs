//! Native RandomX proof-of-work for the Salvium wallet core.
//!
//! Pipeline: a 32-byte seed expands into the 256 MiB Argon2d cache plus
//! eight SuperscalarHash programs; dataset items derive from both; the
//! VM hashes block-template blobs against the dataset (precomputed in
//! full mode, derived on the fly in light mode). Difficulty math lives
//! in `sal-types` and is re-exported here.

pub mod aes;
pub mod argon2d;
pub mod blake2_gen;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fpu;
pub mod program;
pub mod session;
pub mod superscalar;
pub mod vm;

pub use cache::Cache;
pub use dataset::{Dataset, DatasetSource};
pub use error::RandomxError;
pub use sal_types::difficulty::hash_meets_difficulty;
pub use session::{
    FoundShare, MiningJob, MiningMode, MiningObserver, MiningSession, NullObserver, SessionState,
};
pub use vm::Vm;

/// Convenience one-shot hash in light mode: builds a cache for `key`
/// and hashes `input`. Expensive (seconds); reuse a [`Cache`] + [`Vm`]
/// for anything beyond a single hash.
pub fn randomx_hash_light(key: &[u8], input: &[u8]) -> [u8; 32] {
    let cache = Cache::new(key);
    let mut vm = Vm::new(DatasetSource::Light(&cache));
    vm.hash(input)
}

//! RandomX cache: Argon2d-filled memory plus the eight superscalar
//! programs derived from the same seed.

use crate::argon2d::{self, Block};
use crate::blake2_gen::Blake2Generator;
use crate::config::{ARGON_MEMORY_KIB, CACHE_ACCESSES, CACHE_LINE_COUNT};
use crate::superscalar::{self, SuperscalarProgram};

pub struct Cache {
    /// 256 MiB as qwords (2^25 entries).
    memory: Vec<u64>,
    programs: Vec<SuperscalarProgram>,
    seed: Vec<u8>,
}

impl Cache {
    /// Deterministic build from a 32-byte (or shorter) seed. Allocates
    /// 256 MiB and runs the three Argon2d passes — seconds of work.
    pub fn new(seed: &[u8]) -> Self {
        log::info!("initializing RandomX cache ({} KiB Argon2d)", ARGON_MEMORY_KIB);
        let mut blocks: Vec<Block> = vec![[0u64; argon2d::QWORDS_PER_BLOCK]; ARGON_MEMORY_KIB as usize];
        argon2d::fill_memory(&mut blocks, seed);

        let mut memory = Vec::with_capacity(blocks.len() * argon2d::QWORDS_PER_BLOCK);
        for block in &blocks {
            memory.extend_from_slice(block);
        }
        drop(blocks);

        let mut gen = Blake2Generator::new(seed, 0);
        let programs = (0..CACHE_ACCESSES).map(|_| superscalar::generate(&mut gen)).collect();

        Self { memory, programs, seed: seed.to_vec() }
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    pub fn programs(&self) -> &[SuperscalarProgram] {
        &self.programs
    }

    /// 64-byte cache line as 8 qwords.
    #[inline]
    pub fn line(&self, line_index: u64) -> &[u64] {
        let idx = (line_index % CACHE_LINE_COUNT as u64) as usize * 8;
        &self.memory[idx..idx + 8]
    }

    #[cfg(test)]
    pub(crate) fn raw_memory(&self) -> &[u64] {
        &self.memory
    }
}

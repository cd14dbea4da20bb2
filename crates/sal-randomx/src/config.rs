//! RandomX parameters (the production parameter set used by Monero and
//! Salvium). Changing any of these forks the proof-of-work.

/// Argon2d cache fill.
pub const ARGON_MEMORY_KIB: u32 = 262144;
pub const ARGON_ITERATIONS: u32 = 3;
pub const ARGON_LANES: u32 = 1;
pub const ARGON_SALT: &[u8] = b"RandomX\x03";

/// Cache geometry: 256 MiB of 64-byte lines.
pub const CACHE_SIZE: usize = ARGON_MEMORY_KIB as usize * 1024;
pub const CACHE_LINE_SIZE: usize = 64;
pub const CACHE_LINE_COUNT: usize = CACHE_SIZE / CACHE_LINE_SIZE;

/// SuperscalarHash.
pub const CACHE_ACCESSES: usize = 8;
pub const SUPERSCALAR_LATENCY: usize = 170;
pub const SUPERSCALAR_MAX_SIZE: usize = 3 * SUPERSCALAR_LATENCY + 2;

/// Dataset geometry.
pub const DATASET_BASE_SIZE: u64 = 2_147_483_648;
pub const DATASET_EXTRA_SIZE: u64 = 33_554_368;
pub const DATASET_ITEM_SIZE: usize = 64;
pub const DATASET_ITEM_COUNT: u64 = (DATASET_BASE_SIZE + DATASET_EXTRA_SIZE) / DATASET_ITEM_SIZE as u64;
pub const DATASET_EXTRA_ITEMS: u64 = DATASET_EXTRA_SIZE / DATASET_ITEM_SIZE as u64;

/// Scratchpad.
pub const SCRATCHPAD_L1: usize = 16384;
pub const SCRATCHPAD_L2: usize = 262144;
pub const SCRATCHPAD_L3: usize = 2_097_152;
pub const SCRATCHPAD_L1_MASK: u64 = (SCRATCHPAD_L1 - 8) as u64;
pub const SCRATCHPAD_L2_MASK: u64 = (SCRATCHPAD_L2 - 8) as u64;
pub const SCRATCHPAD_L3_MASK: u64 = (SCRATCHPAD_L3 - 8) as u64;
pub const SCRATCHPAD_L3_MASK_64: u64 = (SCRATCHPAD_L3 - 64) as u64;

/// Program shape.
pub const PROGRAM_SIZE: usize = 256;
pub const PROGRAM_ITERATIONS: usize = 2048;
pub const PROGRAM_COUNT: usize = 8;

/// CBRANCH condition geometry.
pub const JUMP_BITS: u32 = 8;
pub const JUMP_OFFSET: u32 = 8;
/// ISTORE uses L3 when the condition nibble reaches this value.
pub const STORE_L3_CONDITION: u8 = 14;

/// Dataset addressing mask (cache-line aligned within the base size).
pub const CACHE_LINE_ALIGN_MASK: u64 = (DATASET_BASE_SIZE - 1) & !(CACHE_LINE_SIZE as u64 - 1);

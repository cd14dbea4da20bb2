//! Argon2d memory fill for the RandomX cache.
//!
//! RandomX keeps the filled block matrix instead of the password tag and
//! runs Argon2 with a zero-length output, which fixed-tag-length Argon2
//! APIs cannot express — so the fill is implemented here directly:
//! BLAKE2b H0, H' expansion of the first two blocks, then the data-
//! dependent single-lane fill (version 0x13 XOR overwrite on passes > 0).

use crate::config::{ARGON_ITERATIONS, ARGON_LANES, ARGON_MEMORY_KIB, ARGON_SALT};

pub const BLOCK_SIZE: usize = 1024;
pub const QWORDS_PER_BLOCK: usize = BLOCK_SIZE / 8;

const SYNC_POINTS: usize = 4;
const VERSION: u32 = 0x13;
/// Argon2d type id.
const ARGON_TYPE: u32 = 0;

fn blake2b(out_len: usize, parts: &[&[u8]]) -> Vec<u8> {
    let mut state = blake2b_simd::Params::new().hash_length(out_len).to_state();
    for p in parts {
        state.update(p);
    }
    state.finalize().as_bytes().to_vec()
}

/// H0: parameter block hash, tag length zero.
fn initial_hash(password: &[u8]) -> [u8; 64] {
    let fields: [u32; 6] = [ARGON_LANES, 0, ARGON_MEMORY_KIB, ARGON_ITERATIONS, VERSION, ARGON_TYPE];
    let mut input = Vec::with_capacity(64 + password.len() + ARGON_SALT.len());
    for f in fields {
        input.extend_from_slice(&f.to_le_bytes());
    }
    input.extend_from_slice(&(password.len() as u32).to_le_bytes());
    input.extend_from_slice(password);
    input.extend_from_slice(&(ARGON_SALT.len() as u32).to_le_bytes());
    input.extend_from_slice(ARGON_SALT);
    input.extend_from_slice(&0u32.to_le_bytes()); // secret
    input.extend_from_slice(&0u32.to_le_bytes()); // associated data
    let h = blake2b(64, &[&input]);
    let mut out = [0u8; 64];
    out.copy_from_slice(&h);
    out
}

/// H': variable-length BLAKE2b expansion (RFC 9106 section 3.3).
fn h_prime(out: &mut [u8], input: &[&[u8]]) {
    let out_len = out.len();
    let len_prefix = (out_len as u32).to_le_bytes();
    if out_len <= 64 {
        let mut parts: Vec<&[u8]> = vec![&len_prefix];
        parts.extend_from_slice(input);
        out.copy_from_slice(&blake2b(out_len, &parts));
        return;
    }
    let mut parts: Vec<&[u8]> = vec![&len_prefix];
    parts.extend_from_slice(input);
    let mut v = blake2b(64, &parts);
    out[..32].copy_from_slice(&v[..32]);
    let mut pos = 32;
    while out_len - pos > 64 {
        v = blake2b(64, &[&v]);
        out[pos..pos + 32].copy_from_slice(&v[..32]);
        pos += 32;
    }
    let last = blake2b(out_len - pos, &[&v]);
    out[pos..].copy_from_slice(&last);
}

/// One 1 KiB block as 128 qwords.
pub type Block = [u64; QWORDS_PER_BLOCK];

fn block_from_bytes(bytes: &[u8]) -> Block {
    let mut b = [0u64; QWORDS_PER_BLOCK];
    for (i, q) in b.iter_mut().enumerate() {
        *q = u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap());
    }
    b
}

/// BlaMka: a + b + 2 * lo(a) * lo(b).
#[inline(always)]
fn fbla(a: u64, b: u64) -> u64 {
    let lo = (a as u32 as u64).wrapping_mul(b as u32 as u64);
    a.wrapping_add(b).wrapping_add(lo.wrapping_mul(2))
}

/// BLAKE2b mixing with BlaMka additions.
#[inline(always)]
fn gmix(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize) {
    v[a] = fbla(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = fbla(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = fbla(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = fbla(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

fn permute(v: &mut [u64; 16]) {
    gmix(v, 0, 4, 8, 12);
    gmix(v, 1, 5, 9, 13);
    gmix(v, 2, 6, 10, 14);
    gmix(v, 3, 7, 11, 15);
    gmix(v, 0, 5, 10, 15);
    gmix(v, 1, 6, 11, 12);
    gmix(v, 2, 7, 8, 13);
    gmix(v, 3, 4, 9, 14);
}

/// Compression G(X, Y): R = X^Y, permute rows then columns, output R^Z.
fn compress(x: &Block, y: &Block) -> Block {
    let mut r = [0u64; QWORDS_PER_BLOCK];
    for i in 0..QWORDS_PER_BLOCK {
        r[i] = x[i] ^ y[i];
    }
    let mut z = r;

    // Rows: 8 runs of 16 consecutive qwords.
    for row in 0..8 {
        let mut v: [u64; 16] = z[row * 16..row * 16 + 16].try_into().unwrap();
        permute(&mut v);
        z[row * 16..row * 16 + 16].copy_from_slice(&v);
    }
    // Columns: 8 runs of qword pairs with stride 16.
    for col in 0..8 {
        let mut v = [0u64; 16];
        for i in 0..8 {
            v[2 * i] = z[2 * col + 16 * i];
            v[2 * i + 1] = z[2 * col + 16 * i + 1];
        }
        permute(&mut v);
        for i in 0..8 {
            z[2 * col + 16 * i] = v[2 * i];
            z[2 * col + 16 * i + 1] = v[2 * i + 1];
        }
    }

    for i in 0..QWORDS_PER_BLOCK {
        r[i] ^= z[i];
    }
    r
}

/// Data-dependent reference block index (single lane).
fn reference_index(pass: u32, slice: usize, index: usize, segment_length: usize, lane_length: usize, j1: u64) -> usize {
    let reference_area = if pass == 0 {
        if slice == 0 {
            index - 1
        } else {
            slice * segment_length + index - 1
        }
    } else {
        lane_length - segment_length + index - 1
    } as u64;

    let x = (j1 * j1) >> 32;
    let y = (reference_area * x) >> 32;
    let z = reference_area - 1 - y;

    let start = if pass == 0 {
        0
    } else {
        ((slice + 1) * segment_length) % lane_length
    } as u64;

    ((start + z) % lane_length as u64) as usize
}

/// Fill `memory` (ARGON_MEMORY_KIB blocks) from `password`.
pub fn fill_memory(memory: &mut [Block], password: &[u8]) {
    let lane_length = ARGON_MEMORY_KIB as usize;
    assert_eq!(memory.len(), lane_length);
    let segment_length = lane_length / SYNC_POINTS;

    let h0 = initial_hash(password);

    // First two blocks: H'(H0 || index || lane).
    let mut block_bytes = [0u8; BLOCK_SIZE];
    for i in 0..2u32 {
        h_prime(&mut block_bytes, &[&h0, &i.to_le_bytes(), &0u32.to_le_bytes()]);
        memory[i as usize] = block_from_bytes(&block_bytes);
    }

    for pass in 0..ARGON_ITERATIONS {
        for slice in 0..SYNC_POINTS {
            let start_index = if pass == 0 && slice == 0 { 2 } else { 0 };
            for index in start_index..segment_length {
                let curr = slice * segment_length + index;
                let prev = if curr == 0 { lane_length - 1 } else { curr - 1 };

                // Argon2d: J1 from the previous block's first qword.
                let j1 = memory[prev][0] & 0xFFFF_FFFF;
                let ref_idx = reference_index(pass, slice, index, segment_length, lane_length, j1);

                let new_block = compress(&memory[prev], &memory[ref_idx]);
                if pass == 0 {
                    memory[curr] = new_block;
                } else {
                    // Version 0x13: XOR with the block being overwritten.
                    for i in 0..QWORDS_PER_BLOCK {
                        memory[curr][i] ^= new_block[i];
                    }
                }
            }
        }
    }
}

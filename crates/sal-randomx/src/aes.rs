//! AES-round generators and the scratchpad digest.
//!
//! RandomX uses bare AES rounds (AESENC/AESDEC semantics, no key
//! schedule) over a 64-byte 4-column state. Round keys and initial
//! states are the BLAKE2b digests of fixed strings, derived once:
//!
//! * `AesGenerator1R`: one round per column per 64 output bytes
//!   (scratchpad fill).
//! * `AesGenerator4R`: four rounds per column (program generation).
//! * `AesHash1R`: absorbs 64-byte blocks, two finalizer rounds
//!   (scratchpad digest).

use std::sync::OnceLock;

use aes::cipher::generic_array::GenericArray;
use aes::hazmat::{cipher_round, equiv_inv_cipher_round};

type AesBlock = GenericArray<u8, aes::cipher::consts::U16>;

fn to_block(bytes: &[u8]) -> AesBlock {
    *AesBlock::from_slice(&bytes[..16])
}

/// AESENC: ShiftRows, SubBytes, MixColumns, AddRoundKey.
#[inline]
fn enc(state: &mut AesBlock, key: &AesBlock) {
    cipher_round(state, key);
}

/// AESDEC: InvShiftRows, InvSubBytes, InvMixColumns, AddRoundKey.
#[inline]
fn dec(state: &mut AesBlock, key: &AesBlock) {
    equiv_inv_cipher_round(state, key);
}

fn derive_keys(domain: &[u8], count: usize) -> Vec<AesBlock> {
    // 4 keys per 64-byte digest.
    let mut keys = Vec::with_capacity(count);
    let digest = blake2b_simd::Params::new()
        .hash_length(count.min(4) * 16)
        .hash(domain);
    for chunk in digest.as_bytes().chunks(16) {
        keys.push(to_block(chunk));
    }
    keys
}

struct GenKeys {
    gen1: [AesBlock; 4],
    gen4: [AesBlock; 8],
    hash_state: [AesBlock; 4],
    hash_xkeys: [AesBlock; 2],
}

fn keys() -> &'static GenKeys {
    static KEYS: OnceLock<GenKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let g1 = derive_keys(b"RandomX AesGenerator1R keys", 4);
        let g4a = derive_keys(b"RandomX AesGenerator4R keys 0-3", 4);
        let g4b = derive_keys(b"RandomX AesGenerator4R keys 4-7", 4);
        let hs = derive_keys(b"RandomX AesHash1R state", 4);
        let xk = {
            let digest = blake2b_simd::Params::new()
                .hash_length(32)
                .hash(b"RandomX AesHash1R xkeys");
            [to_block(&digest.as_bytes()[..16]), to_block(&digest.as_bytes()[16..32])]
        };
        GenKeys {
            gen1: [g1[0], g1[1], g1[2], g1[3]],
            gen4: [g4a[0], g4a[1], g4a[2], g4a[3], g4b[0], g4b[1], g4b[2], g4b[3]],
            hash_state: [hs[0], hs[1], hs[2], hs[3]],
            hash_xkeys: xk,
        }
    })
}

fn load_state(seed: &[u8; 64]) -> [AesBlock; 4] {
    [
        to_block(&seed[0..16]),
        to_block(&seed[16..32]),
        to_block(&seed[32..48]),
        to_block(&seed[48..64]),
    ]
}

fn store_state(state: &[AesBlock; 4]) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (i, s) in state.iter().enumerate() {
        out[i * 16..i * 16 + 16].copy_from_slice(s.as_slice());
    }
    out
}

/// Fill `out` from `seed` with one AES round per column per 64 bytes.
/// Returns the final generator state (the reference implementation
/// stores it back into the seed buffer, and program chaining depends on
/// that).
pub fn fill_aes_1r(seed: &[u8; 64], out: &mut [u8]) -> [u8; 64] {
    debug_assert_eq!(out.len() % 64, 0);
    let k = keys();
    let mut state = load_state(seed);

    for block in out.chunks_exact_mut(64) {
        dec(&mut state[0], &k.gen1[0]);
        enc(&mut state[1], &k.gen1[1]);
        dec(&mut state[2], &k.gen1[2]);
        enc(&mut state[3], &k.gen1[3]);
        for (i, s) in state.iter().enumerate() {
            block[i * 16..i * 16 + 16].copy_from_slice(s.as_slice());
        }
    }
    store_state(&state)
}

/// Fill `out` from `seed` with four AES rounds per column per 64 bytes.
pub fn fill_aes_4r(seed: &[u8; 64], out: &mut [u8]) {
    debug_assert_eq!(out.len() % 64, 0);
    let k = keys();
    let mut state = load_state(seed);

    for block in out.chunks_exact_mut(64) {
        for round in 0..4 {
            dec(&mut state[0], &k.gen4[round]);
            enc(&mut state[1], &k.gen4[round]);
            dec(&mut state[2], &k.gen4[round + 4]);
            enc(&mut state[3], &k.gen4[round + 4]);
        }
        for (i, s) in state.iter().enumerate() {
            block[i * 16..i * 16 + 16].copy_from_slice(s.as_slice());
        }
    }
}

/// 64-byte digest of `input` (the scratchpad) via alternating AES
/// rounds and the two finalizer keys.
pub fn hash_aes_1r(input: &[u8]) -> [u8; 64] {
    debug_assert_eq!(input.len() % 64, 0);
    let k = keys();
    let mut state = k.hash_state;

    for block in input.chunks_exact(64) {
        enc(&mut state[0], &to_block(&block[0..16]));
        dec(&mut state[1], &to_block(&block[16..32]));
        enc(&mut state[2], &to_block(&block[32..48]));
        dec(&mut state[3], &to_block(&block[48..64]));
    }
    for xkey in &k.hash_xkeys {
        enc(&mut state[0], xkey);
        dec(&mut state[1], xkey);
        enc(&mut state[2], xkey);
        dec(&mut state[3], xkey);
    }
    store_state(&state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_deterministic_and_seed_sensitive() {
        let seed_a = [1u8; 64];
        let seed_b = [2u8; 64];
        let mut out_a1 = vec![0u8; 256];
        let mut out_a2 = vec![0u8; 256];
        let mut out_b = vec![0u8; 256];
        fill_aes_1r(&seed_a, &mut out_a1);
        fill_aes_1r(&seed_a, &mut out_a2);
        fill_aes_1r(&seed_b, &mut out_b);
        assert_eq!(out_a1, out_a2);
        assert_ne!(out_a1, out_b);
    }

    #[test]
    fn final_state_continues_the_stream() {
        // Filling 128 bytes at once must equal filling 64 then resuming
        // from the returned state.
        let seed = [7u8; 64];
        let mut whole = vec![0u8; 128];
        fill_aes_1r(&seed, &mut whole);

        let mut first = vec![0u8; 64];
        let mid_state = fill_aes_1r(&seed, &mut first);
        let mut second = vec![0u8; 64];
        fill_aes_1r(&mid_state, &mut second);

        assert_eq!(&whole[..64], &first[..]);
        assert_eq!(&whole[64..], &second[..]);
    }

    #[test]
    fn hash_depends_on_every_block() {
        let mut data = vec![0u8; 192];
        let h1 = hash_aes_1r(&data);
        data[130] ^= 1;
        let h2 = hash_aes_1r(&data);
        assert_ne!(h1, h2);
    }

    #[test]
    fn four_round_output_differs_from_one_round() {
        let seed = [9u8; 64];
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        fill_aes_1r(&seed, &mut a);
        fill_aes_4r(&seed, &mut b);
        assert_ne!(a, b);
    }
}

//! Hash functions used across the protocol.
//!
//! `keccak256` is the original Keccak with 0x01 padding (CryptoNote's
//! `cn_fast_hash`), not SHA-3. BLAKE2b supports variable output length
//! and optional keying per RFC 7693; the CARROT protocol leans on the
//! keyed form for every domain-separated derivation.

use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// Keccak-256 (pre-SHA-3 padding).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut out = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut out);
    out
}

/// Keccak-256 over a sequence of segments, hashed as one message.
pub fn keccak256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut out = [0u8; 32];
    for p in parts {
        keccak.update(p);
    }
    keccak.finalize(&mut out);
    out
}

/// Unkeyed BLAKE2b with `out_len` in [1, 64].
pub fn blake2b(data: &[u8], out_len: usize) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// Keyed BLAKE2b (key up to 64 bytes) with `out_len` in [1, 64].
pub fn blake2b_keyed(data: &[u8], out_len: usize, key: &[u8]) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .key(key)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_empty_is_cryptonote_variant() {
        // Distinguishes Keccak (0x01 padding) from SHA-3-256 (0x06).
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn keccak_multi_equals_concat() {
        let whole = keccak256(b"abcdef");
        let parts = keccak256_multi(&[b"ab", b"cd", b"ef"]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn blake2b_rfc7693_vector() {
        // RFC 7693 appendix A: BLAKE2b-512("abc").
        let h = blake2b(b"abc", 64);
        assert_eq!(
            hex::encode(&h[..16]),
            "ba80a53f981c4d0d6a2797b69f12f6e9"
        );
    }

    #[test]
    fn blake2b_output_lengths() {
        for len in [1usize, 3, 8, 32, 64] {
            assert_eq!(blake2b(b"x", len).len(), len);
            assert_eq!(blake2b_keyed(b"x", len, b"key").len(), len);
        }
    }

    #[test]
    fn keyed_differs_from_unkeyed() {
        assert_ne!(blake2b(b"data", 32), blake2b_keyed(b"data", 32, b"k"));
    }

    #[test]
    fn sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

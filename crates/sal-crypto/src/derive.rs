//! Legacy CryptoNote output-key derivations.
//!
//! The sender/receiver shared point is `8*(r*V) = 8*(v*R)`; everything
//! downstream hashes its compressed form together with the output index
//! varint. These routines are shared by the scanner (receiver side) and
//! the builder (sender side).

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::curve::{compress, decompress, mul_base};
use crate::error::CryptoError;
use crate::hash::{keccak256, keccak256_multi};
use crate::hash2point::hash_to_point;

fn varint(mut v: u64, buf: &mut Vec<u8>) {
    loop {
        let b = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(b);
            break;
        }
        buf.push(b | 0x80);
    }
}

/// ECDH shared point `D = 8 * (secret * point)`, compressed.
pub fn key_derivation(point: &[u8; 32], secret: &Scalar) -> Result<[u8; 32], CryptoError> {
    let p = decompress(point)?;
    Ok(compress(&(secret * p).mul_by_cofactor()))
}

/// `H_s(D || varint(index))`.
pub fn derivation_to_scalar(derivation: &[u8; 32], output_index: u32) -> Scalar {
    let mut buf = Vec::with_capacity(37);
    buf.extend_from_slice(derivation);
    varint(output_index as u64, &mut buf);
    Scalar::from_bytes_mod_order(keccak256(&buf))
}

/// One-time output public key `P = H_s(D || i)*G + B`.
pub fn derive_public_key(
    derivation: &[u8; 32],
    output_index: u32,
    spend_pubkey: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    let b = decompress(spend_pubkey)?;
    let h = derivation_to_scalar(derivation, output_index);
    Ok(compress(&(mul_base(&h) + b)))
}

/// One-time output secret key `x = H_s(D || i) + b`.
pub fn derive_secret_key(derivation: &[u8; 32], output_index: u32, spend_secret: &Scalar) -> Scalar {
    derivation_to_scalar(derivation, output_index) + spend_secret
}

/// 1-byte view tag: `keccak("view_tag" || D || varint(i))[0]`.
pub fn derive_view_tag(derivation: &[u8; 32], output_index: u32) -> u8 {
    let mut buf = Vec::with_capacity(45);
    buf.extend_from_slice(b"view_tag");
    buf.extend_from_slice(derivation);
    varint(output_index as u64, &mut buf);
    keccak256(&buf)[0]
}

/// XOR pad for the 8-byte encrypted amount: `keccak("amount" || ss)`.
fn amount_factor(shared_secret: &[u8; 32]) -> [u8; 32] {
    keccak256_multi(&[b"amount", shared_secret])
}

pub fn encode_amount(amount: u64, shared_secret: &[u8; 32]) -> [u8; 8] {
    let f = amount_factor(shared_secret);
    let le = amount.to_le_bytes();
    let mut out = [0u8; 8];
    for i in 0..8 {
        out[i] = le[i] ^ f[i];
    }
    out
}

pub fn decode_amount(encrypted: &[u8; 8], shared_secret: &[u8; 32]) -> u64 {
    let f = amount_factor(shared_secret);
    let mut le = [0u8; 8];
    for i in 0..8 {
        le[i] = encrypted[i] ^ f[i];
    }
    u64::from_le_bytes(le)
}

/// Key image `I = x * H_p(P)`.
pub fn generate_key_image(public_key: &[u8; 32], secret: &Scalar) -> [u8; 32] {
    compress(&(secret * hash_to_point(public_key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::random_scalar;

    #[test]
    fn sender_receiver_derivations_agree() {
        // Sender: r, R = r*G; receiver: v, V = v*G.
        let r = random_scalar();
        let v = random_scalar();
        let big_r = compress(&mul_base(&r));
        let big_v = compress(&mul_base(&v));
        let sender = key_derivation(&big_v, &r).unwrap();
        let receiver = key_derivation(&big_r, &v).unwrap();
        assert_eq!(sender, receiver);
    }

    #[test]
    fn onetime_keypair_is_consistent() {
        let r = random_scalar();
        let v = random_scalar();
        let b = random_scalar();
        let derivation = key_derivation(&compress(&mul_base(&v)), &r).unwrap();

        let pub_derived = derive_public_key(&derivation, 3, &compress(&mul_base(&b))).unwrap();
        let sec_derived = derive_secret_key(&derivation, 3, &b);
        assert_eq!(compress(&mul_base(&sec_derived)), pub_derived);
    }

    #[test]
    fn amount_xor_roundtrip() {
        let ss = [0x31u8; 32];
        for amount in [0u64, 1, 123_456_789, u64::MAX] {
            assert_eq!(decode_amount(&encode_amount(amount, &ss), &ss), amount);
        }
    }

    #[test]
    fn view_tag_depends_on_index() {
        let d = [0x44u8; 32];
        assert_ne!(derive_view_tag(&d, 0), derive_view_tag(&d, 1));
    }

    #[test]
    fn key_image_deterministic_and_distinct_per_secret() {
        let x = random_scalar();
        let y = random_scalar();
        let p = compress(&mul_base(&x));
        assert_eq!(generate_key_image(&p, &x), generate_key_image(&p, &x));
        assert_ne!(generate_key_image(&p, &x), generate_key_image(&p, &y));
    }

    #[test]
    fn key_image_lies_in_prime_order_subgroup() {
        let x = random_scalar();
        let p = compress(&mul_base(&x));
        assert!(crate::curve::key_image_is_valid(&generate_key_image(&p, &x)));
    }
}

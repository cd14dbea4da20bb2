//! Scalar and point helpers over curve25519-dalek, plus the fixed
//! generators G, H (Pedersen) and T (CARROT dual-key basis).
//!
//! Canonical encodings everywhere: scalars are 32 LE bytes < L, points
//! are compressed Edwards y with the x sign bit in bit 255. Decoding from
//! untrusted bytes goes through the canonical-checking paths which return
//! `CryptoError` instead of panicking.

use std::sync::OnceLock;

use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{Identity, IsIdentity, VartimeMultiscalarMul};

use crate::error::CryptoError;
use crate::hash::keccak256_multi;

/// Pedersen H: `hash_to_point(G)`.
pub const H_BYTES: [u8; 32] = [
    0x8b, 0x65, 0x59, 0x70, 0x15, 0x37, 0x99, 0xaf, 0x2a, 0xea, 0xdc, 0x9f, 0xf1, 0xad, 0xd0,
    0xea, 0x6c, 0x72, 0x51, 0xd5, 0x41, 0x54, 0xcf, 0xa9, 0x2c, 0x17, 0x3a, 0x0d, 0xd3, 0x9c,
    0x1f, 0x94,
];

/// CARROT second generator T, derived from the same fixed constant as H.
pub const T_BYTES: [u8; 32] = [
    0x96, 0x6f, 0xc6, 0x6b, 0x82, 0xcd, 0x56, 0xcf, 0x85, 0xea, 0xec, 0x80, 0x1c, 0x42, 0x84,
    0x5f, 0x5f, 0x40, 0x88, 0x78, 0xd1, 0x56, 0x1e, 0x00, 0xd3, 0xd7, 0xde, 0xd2, 0x79, 0x4d,
    0x09, 0x4f,
];

/// Decompressed H, initialized once.
pub fn h_point() -> &'static EdwardsPoint {
    static H: OnceLock<EdwardsPoint> = OnceLock::new();
    H.get_or_init(|| {
        CompressedEdwardsY(H_BYTES)
            .decompress()
            .expect("H generator constant decompresses")
    })
}

/// Decompressed T, initialized once.
pub fn t_point() -> &'static EdwardsPoint {
    static T: OnceLock<EdwardsPoint> = OnceLock::new();
    T.get_or_init(|| {
        CompressedEdwardsY(T_BYTES)
            .decompress()
            .expect("T generator constant decompresses")
    })
}

/// 8^-1 mod L, used to pre-divide points that verifiers re-multiply by 8.
pub fn inv_eight() -> &'static Scalar {
    static INV8: OnceLock<Scalar> = OnceLock::new();
    INV8.get_or_init(|| Scalar::from(8u64).invert())
}

// ─── Scalars ────────────────────────────────────────────────────────────

/// Strict decode: rejects encodings >= L.
pub fn scalar_from_canonical(bytes: [u8; 32]) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes)).ok_or(CryptoError::InvalidScalar)
}

/// True when `bytes` is a canonical scalar encoding (`sc_check`).
pub fn sc_check(bytes: &[u8; 32]) -> bool {
    bool::from(Scalar::from_canonical_bytes(*bytes).is_some())
}

/// Reduce 32 bytes mod L.
pub fn reduce32(bytes: [u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(bytes)
}

/// Reduce 64 bytes (LE 512-bit) mod L.
pub fn reduce64(bytes: [u8; 64]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(&bytes)
}

/// Uniform scalar from 64 bytes of OS entropy.
pub fn random_scalar() -> Scalar {
    let mut wide = [0u8; 64];
    getrandom::getrandom(&mut wide).expect("OS randomness unavailable");
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// `H_s`: keccak over the concatenated parts, reduced mod L.
pub fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256_multi(parts))
}

// ─── Points ─────────────────────────────────────────────────────────────

/// Decompress accepting any on-curve encoding (dalek semantics).
pub fn decompress(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint("not on curve"))
}

/// Decompress and additionally reject non-canonical encodings
/// (y >= p, or a sign bit on x = 0): the re-compressed bytes must match.
pub fn decompress_canonical(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    let p = decompress(bytes)?;
    if p.compress().to_bytes() != *bytes {
        return Err(CryptoError::InvalidPoint("non-canonical encoding"));
    }
    Ok(p)
}

pub fn compress(p: &EdwardsPoint) -> [u8; 32] {
    p.compress().to_bytes()
}

/// `s * G` via the precomputed basepoint table.
pub fn mul_base(s: &Scalar) -> EdwardsPoint {
    ED25519_BASEPOINT_TABLE * s
}

/// Variable-time `a*P + b*G`.
pub fn double_mul_base(a: &Scalar, p: &EdwardsPoint, b: &Scalar) -> EdwardsPoint {
    EdwardsPoint::vartime_multiscalar_mul([a, b], [p, &ED25519_BASEPOINT_POINT])
}

/// Variable-time multiscalar multiplication (Straus under ~190 points,
/// Pippenger above — dalek picks; mandatory path for BP+ verification).
pub fn msm(scalars: &[Scalar], points: &[EdwardsPoint]) -> EdwardsPoint {
    EdwardsPoint::vartime_multiscalar_mul(scalars, points)
}

/// A key image is valid iff it is an on-curve, non-identity element of
/// the prime-order subgroup.
pub fn key_image_is_valid(bytes: &[u8; 32]) -> bool {
    match decompress_canonical(bytes) {
        Ok(p) => !p.is_identity() && p.is_torsion_free(),
        Err(_) => false,
    }
}

/// Identity element.
pub fn identity() -> EdwardsPoint {
    EdwardsPoint::identity()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// L as little-endian bytes.
    const L_BYTES: [u8; 32] = [
        0xed, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58, 0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9,
        0xde, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x10,
    ];

    #[test]
    fn sc_check_boundary() {
        assert!(!sc_check(&L_BYTES));
        let mut l_minus_1 = L_BYTES;
        l_minus_1[0] -= 1;
        assert!(sc_check(&l_minus_1));
        assert!(sc_check(&[0u8; 32]));
    }

    #[test]
    fn reduce32_all_ones() {
        // 2^256 - 1 mod L: spec fixes the first byte at 0x1c.
        let r = reduce32([0xff; 32]);
        assert_eq!(r.to_bytes()[0], 0x1c);
        assert!(sc_check(&r.to_bytes()));
    }

    #[test]
    fn scalar_point_encode_roundtrip() {
        let s = reduce32([0x37; 32]);
        let p = mul_base(&s);
        let restored = decompress_canonical(&compress(&p)).unwrap();
        assert_eq!(p, restored);
    }

    #[test]
    fn decompress_rejects_noncanonical_y() {
        // y = p (equals 0 after reduction, but non-canonical bytes).
        let mut bytes = [0xffu8; 32];
        bytes[0] = 0xed;
        bytes[31] = 0x7f;
        assert!(decompress_canonical(&bytes).is_err());
    }

    #[test]
    fn generators_decompress() {
        assert_eq!(compress(h_point()), H_BYTES);
        assert_eq!(compress(t_point()), T_BYTES);
        assert_ne!(H_BYTES, T_BYTES);
    }

    #[test]
    fn inv_eight_inverts_cofactor_clearing() {
        let p = *h_point();
        let small = p * inv_eight();
        assert_eq!(small.mul_by_cofactor(), p);
    }

    #[test]
    fn key_image_validity() {
        let s = random_scalar();
        let img = crate::hash2point::hash_to_point(b"ring member") * s;
        assert!(key_image_is_valid(&compress(&img)));
        assert!(!key_image_is_valid(&compress(&identity())));
    }

    #[test]
    fn msm_matches_naive() {
        let a = reduce32([1; 32]);
        let b = reduce32([2; 32]);
        let p = mul_base(&a);
        let q = mul_base(&b);
        let naive = p * b + q * a;
        assert_eq!(msm(&[b, a], &[p, q]), naive);
    }
}

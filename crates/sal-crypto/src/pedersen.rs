//! Pedersen commitments over (G, H).

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::curve::{h_point, msm};
use crate::hash::keccak256_multi;

/// `commit(amount, mask) = mask*G + amount*H`.
pub fn commit(amount: u64, mask: &Scalar) -> EdwardsPoint {
    msm(
        &[*mask, Scalar::from(amount)],
        &[curve25519_dalek::constants::ED25519_BASEPOINT_POINT, *h_point()],
    )
}

/// Commitment with the fixed mask 1, used for coinbase and cleartext
/// amounts: `zero_commit(a) = G + a*H`.
pub fn zero_commit(amount: u64) -> EdwardsPoint {
    commit(amount, &Scalar::ONE)
}

/// Deterministic commitment mask for legacy ECDH outputs:
/// `reduce32(keccak("commitment_mask" || shared_secret))`.
pub fn gen_commitment_mask(shared_secret: &[u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256_multi(&[b"commitment_mask", shared_secret]))
}

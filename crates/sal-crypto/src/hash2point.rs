//! Elligator 2 hash-to-point, matching C++ `ge_fromfe_frombytes_vartime`.
//!
//! Maps 32 bytes (a hash) onto the Montgomery curve, converts to twisted
//! Edwards, and leaves cofactor clearing to the caller. Every protocol
//! use multiplies the result by 8; the two call patterns are:
//!
//! * `hash_to_point(data)` = 8 * elligator2(keccak256(data)) — key images,
//!   CLSAG/TCLSAG linking points.
//! * Bulletproofs+ generator derivation feeds `keccak256(data)` through
//!   `hash_to_point` again, i.e. a double Keccak before the map (see
//!   `bulletproofs_plus::generators`).

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};

use crate::field::Fe;

/// Montgomery A = 486662.
const A: u64 = 486662;

fn a_fe() -> Fe {
    Fe::small(A)
}

/// 2*A*(A+2), the fffb1/fffb2 radicand.
fn two_a_a2() -> Fe {
    let a = a_fe();
    a.add(&a).mul(&a.add(&Fe::small(2)))
}

/// A*(A+2)*sqrt(-1), the fffb3/fffb4 radicand.
fn sqm1_a_a2() -> Fe {
    a_fe().mul(&a_fe().add(&Fe::small(2))).mul(&Fe::sqrt_m1())
}

/// Elligator 2 map without cofactor clearing.
///
/// Always succeeds; the output is on the curve but not necessarily in the
/// prime-order subgroup.
pub fn elligator2(hash: &[u8; 32]) -> EdwardsPoint {
    let u = Fe::from_bytes(hash);

    let neg_a = a_fe().neg();
    // v = 2u^2, w = 2u^2 + 1
    let u2 = u.square();
    let v = u2.add(&u2);
    let w = v.add(&Fe::ONE);

    // x = w^2 - 2*A^2*u^2
    let neg_a2 = a_fe().square().neg();
    let x = w.square().add(&neg_a2.add(&neg_a2).mul(&u2));

    // rx = (w/x)^((p+3)/8); y = rx^2 * x is the trial square.
    let mut rx = Fe::div_pow_m1(&w, &x);
    let mut y = rx.square().mul(&x);

    let mut z = neg_a;
    let sign;

    if w.sub(&y).is_zero() {
        // Residue branch, positive root: fffb2 = sqrt(2A(A+2)).
        if let Some(fffb2) = two_a_a2().sqrt() {
            rx = rx.mul(&fffb2);
        }
        rx = rx.mul(&u);
        z = z.mul(&v);
        sign = false;
    } else if w.add(&y).is_zero() {
        // Residue branch, negative root: fffb1 = sqrt(-2A(A+2)).
        if let Some(fffb1) = two_a_a2().neg().sqrt() {
            rx = rx.mul(&fffb1);
        }
        rx = rx.mul(&u);
        z = z.mul(&v);
        sign = false;
    } else {
        // Non-residue: retry against x * sqrt(-1).
        y = y.mul(&Fe::sqrt_m1());
        if w.sub(&y).is_zero() {
            // fffb4 = sqrt(sqrt(-1)*A*(A+2)).
            if let Some(fffb4) = sqm1_a_a2().sqrt() {
                rx = rx.mul(&fffb4);
            }
        } else {
            // fffb3 = sqrt(-sqrt(-1)*A*(A+2)).
            if let Some(fffb3) = sqm1_a_a2().neg().sqrt() {
                rx = rx.mul(&fffb3);
            }
        }
        sign = true;
    }

    if rx.is_odd() != sign {
        rx = rx.neg();
    }

    // Projective Montgomery->Edwards: Z = z + w, Y = z - w, X = rx * Z.
    let zc = z.add(&w);
    let yc = z.sub(&w);
    let xc = rx.mul(&zc);

    let zinv = zc.invert();
    let ax = xc.mul(&zinv);
    let ay = yc.mul(&zinv);

    let mut packed = ay.to_bytes();
    if ax.is_odd() {
        packed[31] |= 0x80;
    }
    CompressedEdwardsY(packed)
        .decompress()
        .expect("elligator2 output is on the curve by construction")
}

/// Protocol hash-to-point: `8 * elligator2(keccak256(data))`.
///
/// The cofactor multiply guarantees prime-order subgroup membership for
/// every input.
pub fn hash_to_point(data: &[u8]) -> EdwardsPoint {
    elligator2(&crate::hash::keccak256(data)).mul_by_cofactor()
}

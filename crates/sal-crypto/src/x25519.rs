//! Constant-time X25519 Montgomery ladder with Salvium's clamping rule.
//!
//! The CARROT ECDH deviates from RFC 7748: only bit 255 of the scalar is
//! cleared. Bits 0-2 stay as derived and bit 254 is not forced, so the
//! ladder must be correct for arbitrary scalars below 2^255 — it walks
//! all 255 bits unconditionally. Field arithmetic uses a radix-2^51
//! representation with lazy carries; the swap chain is branch-free in
//! the scalar.
//!
//! Curve: v^2 = u^3 + 486662 u^2 + u over GF(2^255 - 19), a24 = 121666.

use crate::error::CryptoError;
use crate::field::Fe;

const MASK51: u64 = (1u64 << 51) - 1;
const A24: u64 = 121666;

/// 2p per limb, added before subtraction so limbs never underflow.
const TWO_P: [u64; 5] = [
    0xFFFF_FFFF_FFFDA,
    0xFFFF_FFFF_FFFFE,
    0xFFFF_FFFF_FFFFE,
    0xFFFF_FFFF_FFFFE,
    0xFFFF_FFFF_FFFFE,
];

/// Field element in 5 x 51-bit limbs, lazily reduced.
#[derive(Clone, Copy)]
struct Fe51([u64; 5]);

impl Fe51 {
    const ZERO: Fe51 = Fe51([0; 5]);
    const ONE: Fe51 = Fe51([1, 0, 0, 0, 0]);

    fn load(bytes: &[u8; 32]) -> Fe51 {
        let word = |off: usize| -> u64 {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[off..off + 8]);
            u64::from_le_bytes(b)
        };
        Fe51([
            word(0) & MASK51,
            (word(6) >> 3) & MASK51,
            (word(12) >> 6) & MASK51,
            (word(19) >> 1) & MASK51,
            (word(24) >> 12) & MASK51,
        ])
    }

    /// Fully reduced canonical 32-byte encoding.
    fn store(self) -> [u8; 32] {
        let mut h = self.0;
        for _ in 0..2 {
            let mut carry = h[0] >> 51;
            h[0] &= MASK51;
            for i in 1..5 {
                h[i] += carry;
                carry = h[i] >> 51;
                h[i] &= MASK51;
            }
            h[0] += carry * 19;
        }
        // Conditional subtract p: q = 1 iff h >= p.
        let mut q = (h[0] + 19) >> 51;
        for limb in h.iter().skip(1) {
            q = (limb + q) >> 51;
        }
        h[0] += 19 * q;
        let mut carry = h[0] >> 51;
        h[0] &= MASK51;
        for i in 1..5 {
            h[i] += carry;
            carry = h[i] >> 51;
            h[i] &= MASK51;
        }

        let mut out = [0u8; 32];
        let words = [
            h[0] | (h[1] << 51),
            (h[1] >> 13) | (h[2] << 38),
            (h[2] >> 26) | (h[3] << 25),
            (h[3] >> 39) | (h[4] << 12),
        ];
        for (i, w) in words.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&w.to_le_bytes());
        }
        out
    }

    fn add(&self, rhs: &Fe51) -> Fe51 {
        let mut r = [0u64; 5];
        for i in 0..5 {
            r[i] = self.0[i] + rhs.0[i];
        }
        Fe51(r)
    }

    fn sub(&self, rhs: &Fe51) -> Fe51 {
        let mut r = [0u64; 5];
        for i in 0..5 {
            r[i] = self.0[i] + TWO_P[i] - rhs.0[i];
        }
        Fe51(r)
    }

    fn mul(&self, rhs: &Fe51) -> Fe51 {
        let f = &self.0;
        let g = &rhs.0;
        let m = |a: u64, b: u64| a as u128 * b as u128;

        let g1_19 = g[1].wrapping_mul(19);
        let g2_19 = g[2].wrapping_mul(19);
        let g3_19 = g[3].wrapping_mul(19);
        let g4_19 = g[4].wrapping_mul(19);

        let h0 = m(f[0], g[0]) + m(f[1], g4_19) + m(f[2], g3_19) + m(f[3], g2_19) + m(f[4], g1_19);
        let h1 = m(f[0], g[1]) + m(f[1], g[0]) + m(f[2], g4_19) + m(f[3], g3_19) + m(f[4], g2_19);
        let h2 = m(f[0], g[2]) + m(f[1], g[1]) + m(f[2], g[0]) + m(f[3], g4_19) + m(f[4], g3_19);
        let h3 = m(f[0], g[3]) + m(f[1], g[2]) + m(f[2], g[1]) + m(f[3], g[0]) + m(f[4], g4_19);
        let h4 = m(f[0], g[4]) + m(f[1], g[3]) + m(f[2], g[2]) + m(f[3], g[1]) + m(f[4], g[0]);

        carry5([h0, h1, h2, h3, h4])
    }

    fn square(&self) -> Fe51 {
        self.mul(self)
    }

    fn mul_small(&self, k: u64) -> Fe51 {
        let mut h = [0u128; 5];
        for i in 0..5 {
            h[i] = self.0[i] as u128 * k as u128;
        }
        carry5(h)
    }

    /// z^(p-2) via the standard curve25519 addition chain.
    fn invert(&self) -> Fe51 {
        let z = *self;
        let z2 = z.square();
        let z8 = z2.square().square();
        let z9 = z8.mul(&z);
        let z11 = z9.mul(&z2);
        let z22 = z11.square();
        let z_5_0 = z22.mul(&z9);
        let z_10_5 = sqn(&z_5_0, 5);
        let z_10_0 = z_10_5.mul(&z_5_0);
        let z_20_10 = sqn(&z_10_0, 10);
        let z_20_0 = z_20_10.mul(&z_10_0);
        let z_40_20 = sqn(&z_20_0, 20);
        let z_40_0 = z_40_20.mul(&z_20_0);
        let z_50_10 = sqn(&z_40_0, 10);
        let z_50_0 = z_50_10.mul(&z_10_0);
        let z_100_50 = sqn(&z_50_0, 50);
        let z_100_0 = z_100_50.mul(&z_50_0);
        let z_200_100 = sqn(&z_100_0, 100);
        let z_200_0 = z_200_100.mul(&z_100_0);
        let z_250_50 = sqn(&z_200_0, 50);
        let z_250_0 = z_250_50.mul(&z_50_0);
        let z_255_5 = sqn(&z_250_0, 5);
        z_255_5.mul(&z11)
    }
}

fn sqn(z: &Fe51, n: usize) -> Fe51 {
    let mut r = *z;
    for _ in 0..n {
        r = r.square();
    }
    r
}

fn carry5(h: [u128; 5]) -> Fe51 {
    let mut r = [0u64; 5];
    let mut carry: u128 = 0;
    for i in 0..5 {
        let v = h[i] + carry;
        r[i] = (v as u64) & MASK51;
        carry = v >> 51;
    }
    // 2^255 = 19 (mod p): fold the overflow back through the limbs with a
    // fixed-length chain (no data-dependent early exit).
    let v0 = r[0] as u128 + carry * 19;
    r[0] = (v0 as u64) & MASK51;
    let v1 = r[1] as u128 + (v0 >> 51);
    r[1] = (v1 as u64) & MASK51;
    let v2 = r[2] as u128 + (v1 >> 51);
    r[2] = (v2 as u64) & MASK51;
    let v3 = r[3] as u128 + (v2 >> 51);
    r[3] = (v3 as u64) & MASK51;
    let v4 = r[4] as u128 + (v3 >> 51);
    r[4] = (v4 as u64) & MASK51;
    r[0] += (v4 >> 51) as u64 * 19;
    Fe51(r)
}

/// Branch-free conditional swap on `bit`.
fn cswap(bit: u64, a: &mut Fe51, b: &mut Fe51) {
    let mask = 0u64.wrapping_sub(bit);
    for i in 0..5 {
        let t = mask & (a.0[i] ^ b.0[i]);
        a.0[i] ^= t;
        b.0[i] ^= t;
    }
}

/// Salvium clamp: clear bit 255 only.
pub fn clamp(scalar: &[u8; 32]) -> [u8; 32] {
    let mut s = *scalar;
    s[31] &= 0x7F;
    s
}

/// Montgomery ladder `scalar * u`, constant-time in the scalar.
///
/// No clamping is applied here; callers clamp per the protocol rule.
pub fn montgomery_ladder(scalar: &[u8; 32], u: &[u8; 32]) -> [u8; 32] {
    let mut u_bytes = *u;
    u_bytes[31] &= 0x7F;
    let x1 = Fe51::load(&u_bytes);

    let mut x2 = Fe51::ONE;
    let mut z2 = Fe51::ZERO;
    let mut x3 = x1;
    let mut z3 = Fe51::ONE;
    let mut swap = 0u64;

    for t in (0..255).rev() {
        let bit = ((scalar[t >> 3] >> (t & 7)) & 1) as u64;
        swap ^= bit;
        cswap(swap, &mut x2, &mut x3);
        cswap(swap, &mut z2, &mut z3);
        swap = bit;

        let a = x2.add(&z2);
        let aa = a.square();
        let b = x2.sub(&z2);
        let bb = b.square();
        let e = aa.sub(&bb);
        let c = x3.add(&z3);
        let d = x3.sub(&z3);
        let da = d.mul(&a);
        let cb = c.mul(&b);
        let t0 = da.add(&cb);
        x3 = t0.square();
        let t1 = da.sub(&cb);
        z3 = x1.mul(&t1.square());
        x2 = aa.mul(&bb);
        let t2 = bb.add(&e.mul_small(A24));
        z2 = e.mul(&t2);
    }

    cswap(swap, &mut x2, &mut x3);
    cswap(swap, &mut z2, &mut z3);

    x2.mul(&z2.invert()).store()
}

/// X25519 with the Salvium clamp applied to the scalar.
pub fn x25519(scalar: &[u8; 32], u: &[u8; 32]) -> [u8; 32] {
    montgomery_ladder(&clamp(scalar), u)
}

/// Convert a compressed Edwards point to its Montgomery u-coordinate:
/// `u = (1 + y) / (1 - y)`. Variable-time (public inputs only).
pub fn edwards_to_montgomery_u(point: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    let mut y_bytes = *point;
    y_bytes[31] &= 0x7F;
    let y = Fe::from_bytes(&y_bytes);
    let one_minus_y = Fe::ONE.sub(&y);
    if one_minus_y.is_zero() {
        return Err(CryptoError::InvalidPoint("y = 1 has no Montgomery form"));
    }
    Ok(Fe::ONE.add(&y).mul(&one_minus_y.invert()).to_bytes())
}

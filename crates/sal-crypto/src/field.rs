//! Arithmetic in GF(2^255 - 19) on 4 x u64 little-endian limbs.
//!
//! Variable-time: this module only ever touches public inputs (hash
//! outputs being mapped to points, public keys being converted between
//! curve forms). Secret-dependent field work lives in `x25519`, which has
//! its own constant-time radix-2^51 representation.

/// Field element, little-endian u64 limbs, kept reduced below p.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fe(pub [u64; 4]);

/// p = 2^255 - 19.
const P: [u64; 4] = [
    0xFFFF_FFFF_FFFF_FFED,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
];

/// sqrt(-1) mod p, LE bytes.
const SQRT_M1_BYTES: [u8; 32] = [
    0xb0, 0xa0, 0x0e, 0x4a, 0x27, 0x1b, 0xee, 0xc4, 0x78, 0xe4, 0x2f, 0xad, 0x06, 0x18, 0x43,
    0x2f, 0xa7, 0xd7, 0xfb, 0x3d, 0x99, 0x00, 0x4d, 0x2b, 0x0b, 0xdf, 0xc1, 0x4f, 0x80, 0x24,
    0x83, 0x2b,
];

impl Fe {
    pub const ZERO: Fe = Fe([0, 0, 0, 0]);
    pub const ONE: Fe = Fe([1, 0, 0, 0]);

    pub fn small(v: u64) -> Fe {
        Fe([v, 0, 0, 0])
    }

    pub fn sqrt_m1() -> Fe {
        Fe::from_bytes(&SQRT_M1_BYTES)
    }

    /// Load 32 LE bytes and reduce the full 256-bit value mod p.
    ///
    /// Note: all 256 bits participate (matching the C++
    /// `ge_fromfe_frombytes_vartime` load, which folds bit 255 in rather
    /// than masking it off as `fe_frombytes` does).
    pub fn from_bytes(bytes: &[u8; 32]) -> Fe {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            *limb = u64::from_le_bytes(b);
        }
        Fe(limbs).reduced()
    }

    pub fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    pub fn is_odd(&self) -> bool {
        self.0[0] & 1 == 1
    }

    fn geq_p(&self) -> bool {
        for i in (0..4).rev() {
            if self.0[i] != P[i] {
                return self.0[i] > P[i];
            }
        }
        true
    }

    fn reduced(self) -> Fe {
        let mut r = self;
        while r.geq_p() {
            let (d, _) = sub_raw(&r.0, &P);
            r = Fe(d);
        }
        r
    }

    pub fn add(&self, rhs: &Fe) -> Fe {
        let (sum, carry) = add_raw(&self.0, &rhs.0);
        // Inputs are < p < 2^255, so no carry out of 256 bits.
        debug_assert!(!carry);
        Fe(sum).reduced()
    }

    pub fn sub(&self, rhs: &Fe) -> Fe {
        if cmp_geq(&self.0, &rhs.0) {
            let (d, _) = sub_raw(&self.0, &rhs.0);
            Fe(d)
        } else {
            let (s, _) = add_raw(&self.0, &P);
            let (d, _) = sub_raw(&s, &rhs.0);
            Fe(d).reduced()
        }
    }

    pub fn neg(&self) -> Fe {
        if self.is_zero() {
            Fe::ZERO
        } else {
            let (d, _) = sub_raw(&P, &self.0);
            Fe(d)
        }
    }

    pub fn mul(&self, rhs: &Fe) -> Fe {
        // Schoolbook 4x4 into 8 limbs, then fold 2^256 = 38 (mod p).
        let mut wide = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let v = self.0[i] as u128 * rhs.0[j] as u128 + wide[i + j] as u128 + carry;
                wide[i + j] = v as u64;
                carry = v >> 64;
            }
            wide[i + 4] = carry as u64;
        }

        let lo = [wide[0], wide[1], wide[2], wide[3]];
        let hi = Fe([wide[4], wide[5], wide[6], wide[7]]);
        let hi38 = hi.mul_small(38);
        let (sum, carry) = add_raw(&lo, &hi38.0);
        let mut r = Fe(sum);
        if carry {
            let (s, _) = add_raw(&r.0, &[38, 0, 0, 0]);
            r = Fe(s);
        }
        r.reduced()
    }

    fn mul_small(&self, k: u64) -> Fe {
        let mut out = [0u64; 4];
        let mut carry = 0u128;
        for (i, o) in out.iter_mut().enumerate() {
            let v = self.0[i] as u128 * k as u128 + carry;
            *o = v as u64;
            carry = v >> 64;
        }
        let mut r = Fe(out);
        if carry > 0 {
            let (s, _) = add_raw(&r.0, &[(carry as u64).wrapping_mul(38), 0, 0, 0]);
            r = Fe(s);
        }
        r.reduced()
    }

    pub fn square(&self) -> Fe {
        self.mul(self)
    }

    /// self^exp by square-and-multiply over the LE limb bits.
    pub fn pow(&self, exp: &[u64; 4]) -> Fe {
        let mut acc = Fe::ONE;
        let mut base = *self;
        for limb in exp {
            let mut bits = *limb;
            for _ in 0..64 {
                if bits & 1 == 1 {
                    acc = acc.mul(&base);
                }
                base = base.square();
                bits >>= 1;
            }
        }
        acc
    }

    /// Fermat inverse a^(p-2).
    pub fn invert(&self) -> Fe {
        self.pow(&[
            0xFFFF_FFFF_FFFF_FFEB,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x7FFF_FFFF_FFFF_FFFF,
        ])
    }

    /// self^((p-5)/8) = self^(2^252 - 3).
    pub fn pow_p58(&self) -> Fe {
        self.pow(&[
            0xFFFF_FFFF_FFFF_FFFD,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x0FFF_FFFF_FFFF_FFFF,
        ])
    }

    /// Square root via the (p+3)/8 candidate, corrected with sqrt(-1).
    /// Returns None when self is a non-residue.
    pub fn sqrt(&self) -> Option<Fe> {
        if self.is_zero() {
            return Some(Fe::ZERO);
        }
        // (p+3)/8 = 2^252 - 2.
        let cand = self.pow(&[
            0xFFFF_FFFF_FFFF_FFFE,
            0xFFFF_FFFF_FFFF_FFFF,
            0xFFFF_FFFF_FFFF_FFFF,
            0x0FFF_FFFF_FFFF_FFFF,
        ]);
        if cand.square() == *self {
            return Some(cand);
        }
        let fixed = cand.mul(&Fe::sqrt_m1());
        if fixed.square() == *self {
            return Some(fixed);
        }
        None
    }

    /// (u/v)^((p+3)/8) as u * v^3 * (u * v^7)^((p-5)/8).
    pub fn div_pow_m1(u: &Fe, v: &Fe) -> Fe {
        let v2 = v.square();
        let v3 = v2.mul(v);
        let v7 = v2.square().mul(&v3);
        let t = u.mul(&v7).pow_p58();
        u.mul(&v3).mul(&t)
    }
}

fn cmp_geq(a: &[u64; 4], b: &[u64; 4]) -> bool {
    for i in (0..4).rev() {
        if a[i] != b[i] {
            return a[i] > b[i];
        }
    }
    true
}

fn add_raw(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], bool) {
    let mut out = [0u64; 4];
    let mut carry = 0u64;
    for i in 0..4 {
        let (s1, c1) = a[i].overflowing_add(b[i]);
        let (s2, c2) = s1.overflowing_add(carry);
        out[i] = s2;
        carry = (c1 as u64) + (c2 as u64);
    }
    (out, carry != 0)
}

fn sub_raw(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], bool) {
    let mut out = [0u64; 4];
    let mut borrow = 0u64;
    for i in 0..4 {
        let (d1, b1) = a[i].overflowing_sub(b[i]);
        let (d2, b2) = d1.overflowing_sub(borrow);
        out[i] = d2;
        borrow = (b1 as u64) + (b2 as u64);
    }
    (out, borrow != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_inverse() {
        let a = Fe::from_bytes(&[7u8; 32]);
        let b = Fe::from_bytes(&[13u8; 32]);
        assert_eq!(a.add(&b).sub(&b), a);
        assert_eq!(a.sub(&b).add(&b), a);
    }

    #[test]
    fn mul_by_inverse_is_one() {
        let a = Fe::from_bytes(&[0x42u8; 32]);
        assert_eq!(a.mul(&a.invert()), Fe::ONE);
    }

    #[test]
    fn sqrt_m1_squares_to_minus_one() {
        let i = Fe::sqrt_m1();
        assert_eq!(i.square(), Fe::ONE.neg());
    }

    #[test]
    fn sqrt_of_square_roundtrips() {
        let a = Fe::from_bytes(&[0x5au8; 32]);
        let sq = a.square();
        let r = sq.sqrt().expect("square must have a root");
        assert!(r == a || r == a.neg());
    }

    #[test]
    fn nonresidue_has_no_root() {
        // 2 is a non-residue mod p (p = 5 mod 8).
        assert!(Fe::small(2).sqrt().is_none());
    }

    #[test]
    fn full_256bit_load_reduces() {
        // All-ones input: 2^256 - 1 = 38*2 - 1... just check idempotence
        // of the reduction and byte round-trip below p.
        let fe = Fe::from_bytes(&[0xff; 32]);
        assert!(!fe.geq_p());
        assert_eq!(Fe::from_bytes(&fe.to_bytes()), fe);
    }

    #[test]
    fn neg_zero_is_zero() {
        assert_eq!(Fe::ZERO.neg(), Fe::ZERO);
    }
}

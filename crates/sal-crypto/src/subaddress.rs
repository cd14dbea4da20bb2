//! Subaddress lookup maps, legacy CryptoNote and CARROT.
//!
//! Scanners match recovered spend pubkeys against a precomputed
//! `pubkey -> (major, minor)` table; these helpers populate it for a
//! rectangular index range.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::carrot::{subaddress_spend_pubkey, CarrotKeys};
use crate::curve::{compress, decompress, mul_base};
use crate::error::CryptoError;
use crate::hash::keccak256;

/// Legacy subaddress secret:
/// `m = H_s("SubAddr\0" || view_secret || major_LE || minor_LE)`.
pub fn cn_subaddress_secret(view_secret: &Scalar, major: u32, minor: u32) -> Scalar {
    let mut data = Vec::with_capacity(8 + 32 + 8);
    data.extend_from_slice(b"SubAddr\0");
    data.extend_from_slice(&view_secret.to_bytes());
    data.extend_from_slice(&major.to_le_bytes());
    data.extend_from_slice(&minor.to_le_bytes());
    Scalar::from_bytes_mod_order(keccak256(&data))
}

/// Legacy subaddress spend pubkey `D = B + m*G` (identity at (0,0)).
pub fn cn_subaddress_spend_pubkey(
    spend_pubkey: &EdwardsPoint,
    view_secret: &Scalar,
    major: u32,
    minor: u32,
) -> EdwardsPoint {
    if major == 0 && minor == 0 {
        return *spend_pubkey;
    }
    spend_pubkey + mul_base(&cn_subaddress_secret(view_secret, major, minor))
}

/// Legacy map over majors `0..=major_max`, minors `0..=minor_max`.
pub fn cn_subaddress_map(
    spend_pubkey: &[u8; 32],
    view_secret: &Scalar,
    major_max: u32,
    minor_max: u32,
) -> Result<Vec<([u8; 32], u32, u32)>, CryptoError> {
    let spend_pt = decompress(spend_pubkey)?;
    let mut map =
        Vec::with_capacity((major_max as usize + 1) * (minor_max as usize + 1));
    for major in 0..=major_max {
        for minor in 0..=minor_max {
            let pk = cn_subaddress_spend_pubkey(&spend_pt, view_secret, major, minor);
            map.push((compress(&pk), major, minor));
        }
    }
    Ok(map)
}

/// CARROT map over the same rectangle.
pub fn carrot_subaddress_map(
    keys: &CarrotKeys,
    major_max: u32,
    minor_max: u32,
) -> Result<Vec<([u8; 32], u32, u32)>, CryptoError> {
    let mut map =
        Vec::with_capacity((major_max as usize + 1) * (minor_max as usize + 1));
    for major in 0..=major_max {
        for minor in 0..=minor_max {
            map.push((subaddress_spend_pubkey(keys, major, minor)?, major, minor));
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::random_scalar;

    #[test]
    fn cn_index_zero_is_account_key() {
        let view = random_scalar();
        let spend = random_scalar();
        let spend_pub = compress(&mul_base(&spend));
        let map = cn_subaddress_map(&spend_pub, &view, 1, 1).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map[0], (spend_pub, 0, 0));
    }

    #[test]
    fn cn_subaddress_keys_are_spendable() {
        // Subaddress secret key is spend + m; its pubkey must match.
        let view = random_scalar();
        let spend = random_scalar();
        let spend_pt = mul_base(&spend);
        let m = cn_subaddress_secret(&view, 2, 7);
        let sub_pub = cn_subaddress_spend_pubkey(&spend_pt, &view, 2, 7);
        assert_eq!(compress(&mul_base(&(spend + m))), compress(&sub_pub));
    }

    #[test]
    fn carrot_map_covers_rectangle_without_collisions() {
        let keys = CarrotKeys::from_master(&[3; 32]);
        let map = carrot_subaddress_map(&keys, 2, 3).unwrap();
        assert_eq!(map.len(), 12);
        for i in 0..map.len() {
            for j in i + 1..map.len() {
                assert_ne!(map[i].0, map[j].0);
            }
        }
    }
}

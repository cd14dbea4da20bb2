//! CLSAG ring signatures (Goodell-Noether-Yurchenko), Salvium flavor.
//!
//! Proves knowledge of the secret key at one ring position and that the
//! matching commitment minus the pseudo-output commits to zero, while
//! publishing a key image that links reuse of the same output.
//!
//! Transcript layout matches C++ `CLSAG_Gen`/`CLSAG_Ver` in rctSigs.cpp:
//! zero-padded 32-byte domain tags, aggregation hashes over
//! (ring, commitments, I, D/8, pseudo-out), round hashes additionally
//! over (message, L, R).

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::curve::{compress, decompress, hash_to_scalar, inv_eight, msm, random_scalar};
use crate::error::CryptoError;
use crate::hash2point::hash_to_point;

pub(crate) fn domain_tag(name: &[u8]) -> [u8; 32] {
    let mut d = [0u8; 32];
    d[..name.len()].copy_from_slice(name);
    d
}

pub(crate) const AGG_0: &[u8] = b"CLSAG_agg_0";
pub(crate) const AGG_1: &[u8] = b"CLSAG_agg_1";
pub(crate) const ROUND: &[u8] = b"CLSAG_round";

/// Signature: per-member scalars, the closing challenge, the key image I
/// and the commitment image D (stored divided by 8).
#[derive(Debug, Clone)]
pub struct Clsag {
    pub s: Vec<Scalar>,
    pub c1: Scalar,
    pub key_image: [u8; 32],
    pub commitment_image: [u8; 32],
}

/// Shared transcript state for one ring: the aggregation coefficients and
/// a reusable round-hash prefix.
pub(crate) struct RingTranscript {
    pub mu_p: Scalar,
    pub mu_c: Scalar,
    round_prefix: Vec<u8>,
}

impl RingTranscript {
    pub fn new(
        ring: &[[u8; 32]],
        commitments: &[[u8; 32]],
        key_image: &[u8; 32],
        commitment_image: &[u8; 32],
        pseudo_out: &[u8; 32],
        message: &[u8; 32],
    ) -> Self {
        let n = ring.len();

        // Aggregation hash body shared by mu_P and mu_C.
        let mut agg = Vec::with_capacity(32 * (2 * n + 4));
        agg.extend_from_slice(&domain_tag(AGG_0));
        for p in ring {
            agg.extend_from_slice(p);
        }
        for c in commitments {
            agg.extend_from_slice(c);
        }
        agg.extend_from_slice(key_image);
        agg.extend_from_slice(commitment_image);
        agg.extend_from_slice(pseudo_out);
        let mu_p = hash_to_scalar(&[&agg]);
        agg[..32].copy_from_slice(&domain_tag(AGG_1));
        let mu_c = hash_to_scalar(&[&agg]);

        let mut round_prefix = Vec::with_capacity(32 * (2 * n + 3));
        round_prefix.extend_from_slice(&domain_tag(ROUND));
        for p in ring {
            round_prefix.extend_from_slice(p);
        }
        for c in commitments {
            round_prefix.extend_from_slice(c);
        }
        round_prefix.extend_from_slice(pseudo_out);
        round_prefix.extend_from_slice(message);

        Self { mu_p, mu_c, round_prefix }
    }

    /// Round challenge `H_s(prefix || L || R)`.
    pub fn challenge(&self, l: &EdwardsPoint, r: &EdwardsPoint) -> Scalar {
        hash_to_scalar(&[&self.round_prefix, &compress(l), &compress(r)])
    }
}

/// Sign. `commitment_mask` is `z` with `commitments[index] - pseudo_out = z*G`.
pub fn sign(
    message: &[u8; 32],
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    secret_key: &Scalar,
    commitment_mask: &Scalar,
    pseudo_out: &[u8; 32],
    index: usize,
) -> Result<Clsag, CryptoError> {
    let n = ring.len();
    if n == 0 || commitments.len() != n {
        return Err(CryptoError::InvalidInput("empty or mismatched ring"));
    }
    if index >= n {
        return Err(CryptoError::InvalidInput("secret index out of range"));
    }

    let pseudo_pt = decompress(pseudo_out)?;
    let ring_pts = decompress_ring(ring)?;
    let offsets = commitment_offsets(commitments, &pseudo_pt)?;

    let h_pi = hash_to_point(&ring[index]);
    let key_image_pt = secret_key * h_pi;
    let key_image = compress(&key_image_pt);
    let d_full = commitment_mask * h_pi;
    let commitment_image = compress(&(inv_eight() * d_full));

    let tr = RingTranscript::new(ring, commitments, &key_image, &commitment_image, pseudo_out, message);

    // Nonce round at the real index.
    let alpha = random_scalar();
    let mut c = tr.challenge(&(alpha * ED25519_BASEPOINT_POINT), &(alpha * h_pi));

    let mut s = vec![Scalar::ZERO; n];
    let mut c1 = None;
    let mut i = (index + 1) % n;
    if i == 0 {
        c1 = Some(c);
    }

    while i != index {
        let s_i = random_scalar();
        s[i] = s_i;
        let (l, r) = ring_round(
            &s_i, &c, &tr, &ring_pts[i], &offsets[i], &hash_to_point(&ring[i]),
            &key_image_pt, &d_full,
        );
        c = tr.challenge(&l, &r);
        i = (i + 1) % n;
        if i == 0 {
            c1 = Some(c);
        }
    }

    // Close the ring.
    s[index] = alpha - c * (tr.mu_p * secret_key + tr.mu_c * commitment_mask);

    let c1 = match c1 {
        Some(v) => v,
        None => {
            // Single-member ring: the closing round produces c1 directly.
            let (l, r) = ring_round(
                &s[index], &c, &tr, &ring_pts[index], &offsets[index], &h_pi,
                &key_image_pt, &d_full,
            );
            tr.challenge(&l, &r)
        }
    };

    Ok(Clsag { s, c1, key_image, commitment_image })
}

/// Verify; `Ok(())` on acceptance.
pub fn verify(
    message: &[u8; 32],
    sig: &Clsag,
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_out: &[u8; 32],
) -> Result<(), CryptoError> {
    let n = ring.len();
    if n == 0 || commitments.len() != n || sig.s.len() != n {
        return Err(CryptoError::MalformedProof("ring size mismatch"));
    }

    let pseudo_pt = decompress(pseudo_out)?;
    let ring_pts = decompress_ring(ring)?;
    let offsets = commitment_offsets(commitments, &pseudo_pt)?;
    let key_image_pt = decompress(&sig.key_image)?;
    let d_full = decompress(&sig.commitment_image)?.mul_by_cofactor();

    let tr = RingTranscript::new(
        ring, commitments, &sig.key_image, &sig.commitment_image, pseudo_out, message,
    );

    let mut c = sig.c1;
    for i in 0..n {
        let (l, r) = ring_round(
            &sig.s[i], &c, &tr, &ring_pts[i], &offsets[i], &hash_to_point(&ring[i]),
            &key_image_pt, &d_full,
        );
        c = tr.challenge(&l, &r);
    }

    if c == sig.c1 {
        Ok(())
    } else {
        Err(CryptoError::InvalidProof("CLSAG challenge mismatch"))
    }
}

/// One ring round: L = s*G + c*mu_P*P + c*mu_C*C, R = s*Hp + c*mu_P*I + c*mu_C*D.
#[allow(clippy::too_many_arguments)]
fn ring_round(
    s: &Scalar,
    c: &Scalar,
    tr: &RingTranscript,
    p: &EdwardsPoint,
    c_offset: &EdwardsPoint,
    hp: &EdwardsPoint,
    key_image: &EdwardsPoint,
    d_full: &EdwardsPoint,
) -> (EdwardsPoint, EdwardsPoint) {
    let c_mu_p = c * tr.mu_p;
    let c_mu_c = c * tr.mu_c;
    let l = msm(
        &[*s, c_mu_p, c_mu_c],
        &[ED25519_BASEPOINT_POINT, *p, *c_offset],
    );
    let r = msm(&[*s, c_mu_p, c_mu_c], &[*hp, *key_image, *d_full]);
    (l, r)
}

pub(crate) fn decompress_ring(ring: &[[u8; 32]]) -> Result<Vec<EdwardsPoint>, CryptoError> {
    ring.iter().map(decompress).collect()
}

pub(crate) fn commitment_offsets(
    commitments: &[[u8; 32]],
    pseudo_pt: &EdwardsPoint,
) -> Result<Vec<EdwardsPoint>, CryptoError> {
    commitments
        .iter()
        .map(|c| Ok(decompress(c)? - pseudo_pt))
        .collect()
}

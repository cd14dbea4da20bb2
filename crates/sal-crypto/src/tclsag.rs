//! TCLSAG: twin-secret CLSAG over the (G, T) basis.
//!
//! Each ring key is `P = x*G + y*T`; the signer proves both scalars at
//! one index with separate response vectors `sx`, `sy` but a single
//! challenge chain, key image `I = x*H_p(P)` and commitment image as in
//! CLSAG. Used by RCT type SalviumOne for CARROT-spending inputs.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::clsag::{commitment_offsets, decompress_ring, RingTranscript};
use crate::curve::{compress, decompress, inv_eight, msm, random_scalar, t_point};
use crate::error::CryptoError;
use crate::hash2point::hash_to_point;

/// Twin signature: `sx`/`sy` response vectors, shared `c1`, images.
#[derive(Debug, Clone)]
pub struct Tclsag {
    pub sx: Vec<Scalar>,
    pub sy: Vec<Scalar>,
    pub c1: Scalar,
    pub key_image: [u8; 32],
    pub commitment_image: [u8; 32],
}

/// Sign with twin secrets `(x, y)` for `ring[index] = x*G + y*T`.
#[allow(clippy::too_many_arguments)]
pub fn sign(
    message: &[u8; 32],
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    secret_x: &Scalar,
    secret_y: &Scalar,
    commitment_mask: &Scalar,
    pseudo_out: &[u8; 32],
    index: usize,
) -> Result<Tclsag, CryptoError> {
    let n = ring.len();
    if n == 0 || commitments.len() != n {
        return Err(CryptoError::InvalidInput("empty or mismatched ring"));
    }
    if index >= n {
        return Err(CryptoError::InvalidInput("secret index out of range"));
    }

    let t_gen = *t_point();
    let pseudo_pt = decompress(pseudo_out)?;
    let ring_pts = decompress_ring(ring)?;
    let offsets = commitment_offsets(commitments, &pseudo_pt)?;

    let h_pi = hash_to_point(&ring[index]);
    let key_image_pt = secret_x * h_pi;
    let key_image = compress(&key_image_pt);
    let d_full = commitment_mask * h_pi;
    let commitment_image = compress(&(inv_eight() * d_full));

    let tr = RingTranscript::new(ring, commitments, &key_image, &commitment_image, pseudo_out, message);

    // Twin nonces: L = a*G + b*T, R = a*H_p(P_pi).
    let a = random_scalar();
    let b = random_scalar();
    let l_init = msm(&[a, b], &[ED25519_BASEPOINT_POINT, t_gen]);
    let mut c = tr.challenge(&l_init, &(a * h_pi));

    let mut sx = vec![Scalar::ZERO; n];
    let mut sy = vec![Scalar::ZERO; n];
    let mut c1 = None;
    let mut i = (index + 1) % n;
    if i == 0 {
        c1 = Some(c);
    }

    while i != index {
        let sx_i = random_scalar();
        let sy_i = random_scalar();
        sx[i] = sx_i;
        sy[i] = sy_i;
        let (l, r) = twin_round(
            &sx_i, &sy_i, &c, &tr, &t_gen, &ring_pts[i], &offsets[i],
            &hash_to_point(&ring[i]), &key_image_pt, &d_full,
        );
        c = tr.challenge(&l, &r);
        i = (i + 1) % n;
        if i == 0 {
            c1 = Some(c);
        }
    }

    sx[index] = a - c * (tr.mu_p * secret_x + tr.mu_c * commitment_mask);
    sy[index] = b - c * tr.mu_p * secret_y;

    let c1 = match c1 {
        Some(v) => v,
        None => {
            let (l, r) = twin_round(
                &sx[index], &sy[index], &c, &tr, &t_gen, &ring_pts[index], &offsets[index],
                &h_pi, &key_image_pt, &d_full,
            );
            tr.challenge(&l, &r)
        }
    };

    Ok(Tclsag { sx, sy, c1, key_image, commitment_image })
}

/// Verify; `Ok(())` on acceptance.
pub fn verify(
    message: &[u8; 32],
    sig: &Tclsag,
    ring: &[[u8; 32]],
    commitments: &[[u8; 32]],
    pseudo_out: &[u8; 32],
) -> Result<(), CryptoError> {
    let n = ring.len();
    if n == 0 || commitments.len() != n || sig.sx.len() != n || sig.sy.len() != n {
        return Err(CryptoError::MalformedProof("ring size mismatch"));
    }

    let t_gen = *t_point();
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
        let (l, r) = twin_round(
            &sig.sx[i], &sig.sy[i], &c, &tr, &t_gen, &ring_pts[i], &offsets[i],
            &hash_to_point(&ring[i]), &key_image_pt, &d_full,
        );
        c = tr.challenge(&l, &r);
    }

    if c == sig.c1 {
        Ok(())
    } else {
        Err(CryptoError::InvalidProof("TCLSAG challenge mismatch"))
    }
}

/// L = sx*G + sy*T + c*mu_P*P + c*mu_C*C; R = sx*Hp + c*mu_P*I + c*mu_C*D.
#[allow(clippy::too_many_arguments)]
fn twin_round(
    sx: &Scalar,
    sy: &Scalar,
    c: &Scalar,
    tr: &RingTranscript,
    t_gen: &EdwardsPoint,
    p: &EdwardsPoint,
    c_offset: &EdwardsPoint,
    hp: &EdwardsPoint,
    key_image: &EdwardsPoint,
    d_full: &EdwardsPoint,
) -> (EdwardsPoint, EdwardsPoint) {
    let c_mu_p = c * tr.mu_p;
    let c_mu_c = c * tr.mu_c;
    let l = msm(
        &[*sx, *sy, c_mu_p, c_mu_c],
        &[ED25519_BASEPOINT_POINT, *t_gen, *p, *c_offset],
    );
    let r = msm(&[*sx, c_mu_p, c_mu_c], &[*hp, *key_image, *d_full]);
    (l, r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::mul_base;
    use crate::hash::keccak256;

    struct TwinRing {
        ring: Vec<[u8; 32]>,
        commitments: Vec<[u8; 32]>,
        pseudo_out: [u8; 32],
        x: Scalar,
        y: Scalar,
        z: Scalar,
        index: usize,
    }

    fn build_twin_ring(n: usize, index: usize) -> TwinRing {
        let t_gen = *t_point();
        let mut ring = Vec::with_capacity(n);
        let mut commitments = Vec::with_capacity(n);
        let mut x = Scalar::ZERO;
        let mut y = Scalar::ZERO;
        let mut real_mask = Scalar::ZERO;
        for i in 0..n {
            let xi = random_scalar();
            let yi = random_scalar();
            let mask = random_scalar();
            ring.push(compress(&msm(&[xi, yi], &[ED25519_BASEPOINT_POINT, t_gen])));
            commitments.push(compress(&mul_base(&mask)));
            if i == index {
                x = xi;
                y = yi;
                real_mask = mask;
            }
        }
        let pseudo_mask = random_scalar();
        TwinRing {
            ring,
            commitments,
            pseudo_out: compress(&mul_base(&pseudo_mask)),
            x,
            y,
            z: real_mask - pseudo_mask,
            index,
        }
    }

    #[test]
    fn sign_verify_ring_16() {
        let t = build_twin_ring(16, 7);
        let msg = keccak256(b"tclsag 16");
        let sig = sign(
            &msg, &t.ring, &t.commitments, &t.x, &t.y, &t.z, &t.pseudo_out, t.index,
        )
        .unwrap();
        verify(&msg, &sig, &t.ring, &t.commitments, &t.pseudo_out).unwrap();
    }

    #[test]
    fn wrong_y_secret_fails() {
        let t = build_twin_ring(5, 2);
        let msg = keccak256(b"bad y");
        let sig = sign(
            &msg, &t.ring, &t.commitments, &t.x, &random_scalar(), &t.z, &t.pseudo_out, t.index,
        )
        .unwrap();
        assert!(verify(&msg, &sig, &t.ring, &t.commitments, &t.pseudo_out).is_err());
    }

    #[test]
    fn tampered_sy_rejected() {
        let t = build_twin_ring(5, 0);
        let msg = keccak256(b"tamper sy");
        let mut sig = sign(
            &msg, &t.ring, &t.commitments, &t.x, &t.y, &t.z, &t.pseudo_out, t.index,
        )
        .unwrap();
        sig.sy[3] += Scalar::ONE;
        assert!(verify(&msg, &sig, &t.ring, &t.commitments, &t.pseudo_out).is_err());
    }

    #[test]
    fn key_image_matches_g_component_only() {
        // I = x*H_p(P): independent of y.
        let t = build_twin_ring(3, 1);
        let msg = keccak256(b"ki");
        let sig = sign(
            &msg, &t.ring, &t.commitments, &t.x, &t.y, &t.z, &t.pseudo_out, t.index,
        )
        .unwrap();
        let expected = compress(&(t.x * hash_to_point(&t.ring[t.index])));
        assert_eq!(sig.key_image, expected);
    }
}

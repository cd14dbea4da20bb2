//! CARROT output scanning: the seven-step receiver pipeline.
//!
//! Two entry points share the core: `scan_external` runs the X25519 ECDH
//! with the incoming view key, `scan_internal` substitutes the
//! view-balance secret for the unctx shared secret (self-sends skip the
//! DH). Outputs that fail the commitment re-check or the janus anchor
//! check are rejected outright.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;

use crate::carrot::{self, domain, enote_type, CarrotKeys};
use crate::curve::{compress, decompress, msm, t_point};
use crate::pedersen;
use crate::x25519;

/// One CARROT enote as it appears on chain, plus the cleartext amount
/// for coinbase outputs.
#[derive(Debug, Clone)]
pub struct EnoteScanInput {
    /// One-time address Ko.
    pub onetime_address: [u8; 32],
    /// 3-byte view tag.
    pub view_tag: [u8; 3],
    /// Ephemeral X25519 pubkey D_e from the tx extra.
    pub ephemeral_pubkey: [u8; 32],
    /// 8-byte encrypted amount (ignored when `clear_amount` is set).
    pub encrypted_amount: [u8; 8],
    /// Amount commitment from outPk; `None` for coinbase (implicit
    /// `zero_commit(amount)`).
    pub commitment: Option<[u8; 32]>,
    /// Encrypted janus anchor; `None` skips the janus check.
    pub encrypted_anchor: Option<[u8; 16]>,
    /// Cleartext amount for coinbase outputs.
    pub clear_amount: Option<u64>,
    /// Decrypted payment id bound into the anchor (zeros unless the
    /// payment used an integrated address).
    pub payment_id: [u8; 8],
}

/// Successful scan.
#[derive(Debug, Clone)]
pub struct CarrotScanResult {
    pub amount: u64,
    pub mask: Scalar,
    pub enote_type: u8,
    /// Contextualized sender-receiver secret, kept for spend-key
    /// derivation when the output is spent.
    pub sender_receiver_secret: [u8; 32],
    pub address_spend_pubkey: [u8; 32],
    pub subaddress_major: u32,
    pub subaddress_minor: u32,
    pub is_main_address: bool,
}

/// 3-byte view tag over `(input_context, Ko)` keyed by the unctx secret.
pub fn view_tag(s_sr_unctx: &[u8; 32], input_context: &[u8], onetime_address: &[u8; 32]) -> [u8; 3] {
    let t = carrot::derive_bytes(
        s_sr_unctx,
        domain::VIEW_TAG,
        &[input_context, onetime_address],
        3,
    );
    [t[0], t[1], t[2]]
}

/// `s^ctx_sr = H_32[s_sr]("Carrot sender-receiver secret", D_e, ctx)`.
pub fn sender_receiver_secret(
    s_sr_unctx: &[u8; 32],
    ephemeral_pubkey: &[u8; 32],
    input_context: &[u8],
) -> [u8; 32] {
    carrot::derive_bytes_32(
        s_sr_unctx,
        domain::SENDER_RECEIVER_SECRET,
        &[ephemeral_pubkey, input_context],
    )
}

/// One-time extension scalars `(k^o_g, k^o_t)` bound to the commitment.
pub fn onetime_extensions(s_sr_ctx: &[u8; 32], commitment: &[u8; 32]) -> (Scalar, Scalar) {
    (
        carrot::derive_scalar(s_sr_ctx, domain::EXTENSION_G, &[commitment]),
        carrot::derive_scalar(s_sr_ctx, domain::EXTENSION_T, &[commitment]),
    )
}

/// Walk Ko back to the address spend pubkey:
/// `K^j_s = Ko - k^o_g*G - k^o_t*T`.
pub fn recover_address_spend_pubkey(
    onetime_address: &[u8; 32],
    s_sr_ctx: &[u8; 32],
    commitment: &[u8; 32],
) -> Option<[u8; 32]> {
    let (k_g, k_t) = onetime_extensions(s_sr_ctx, commitment);
    let ko = decompress(onetime_address).ok()?;
    let ext: EdwardsPoint = msm(&[k_g, k_t], &[ED25519_BASEPOINT_POINT, *t_point()]);
    Some(compress(&(ko - ext)))
}

/// 8-byte amount XOR pad.
pub fn amount_mask(s_sr_ctx: &[u8; 32], onetime_address: &[u8; 32]) -> [u8; 8] {
    let m = carrot::derive_bytes(
        s_sr_ctx,
        domain::ENCRYPTION_MASK_AMOUNT,
        &[onetime_address],
        8,
    );
    let mut out = [0u8; 8];
    out.copy_from_slice(&m);
    out
}

pub fn decrypt_amount(encrypted: &[u8; 8], s_sr_ctx: &[u8; 32], onetime_address: &[u8; 32]) -> u64 {
    let m = amount_mask(s_sr_ctx, onetime_address);
    let mut le = [0u8; 8];
    for i in 0..8 {
        le[i] = encrypted[i] ^ m[i];
    }
    u64::from_le_bytes(le)
}

/// 16-byte anchor XOR pad.
pub fn anchor_mask(s_sr_ctx: &[u8; 32], onetime_address: &[u8; 32]) -> [u8; 16] {
    let m = carrot::derive_bytes(
        s_sr_ctx,
        domain::ENCRYPTION_MASK_ANCHOR,
        &[onetime_address],
        16,
    );
    let mut out = [0u8; 16];
    out.copy_from_slice(&m);
    out
}

pub fn decrypt_anchor(
    encrypted: &[u8; 16],
    s_sr_ctx: &[u8; 32],
    onetime_address: &[u8; 32],
) -> [u8; 16] {
    let m = anchor_mask(s_sr_ctx, onetime_address);
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = encrypted[i] ^ m[i];
    }
    out
}

/// Commitment mask `k_a = H_n[s_ctx](amount, K^j_s, enote_type)`.
pub fn commitment_mask(
    s_sr_ctx: &[u8; 32],
    amount: u64,
    address_spend_pubkey: &[u8; 32],
    enote_type: u8,
) -> Scalar {
    carrot::derive_scalar(
        s_sr_ctx,
        domain::COMMITMENT_MASK,
        &[&amount.to_le_bytes(), address_spend_pubkey, &[enote_type]],
    )
}

/// Anchor value for change/self-send enotes, derived from the incoming
/// view key so only the wallet can produce it.
pub fn special_anchor(
    view_incoming_key: &Scalar,
    ephemeral_pubkey: &[u8; 32],
    input_context: &[u8],
    onetime_address: &[u8; 32],
) -> [u8; 16] {
    let m = carrot::derive_bytes(
        &view_incoming_key.to_bytes(),
        domain::JANUS_ANCHOR_SPECIAL,
        &[ephemeral_pubkey, input_context, onetime_address],
        16,
    );
    let mut out = [0u8; 16];
    out.copy_from_slice(&m);
    out
}

/// External scan: X25519 first, then the shared core.
pub fn scan_external(
    keys: &CarrotKeys,
    enote: &EnoteScanInput,
    input_context: &[u8],
    subaddress_map: &[([u8; 32], u32, u32)],
) -> Option<CarrotScanResult> {
    let clamped = x25519::clamp(&keys.view_incoming_key.to_bytes());
    let s_sr_unctx = x25519::montgomery_ladder(&clamped, &enote.ephemeral_pubkey);
    scan_core(keys, &s_sr_unctx, enote, input_context, subaddress_map, true)
}

/// Internal (self-send) scan: the view-balance secret stands in for the
/// DH output; the janus check is skipped (the special anchor already
/// requires the wallet's own keys).
pub fn scan_internal(
    keys: &CarrotKeys,
    enote: &EnoteScanInput,
    input_context: &[u8],
    subaddress_map: &[([u8; 32], u32, u32)],
) -> Option<CarrotScanResult> {
    let s_vb = keys.view_balance_secret;
    scan_core(keys, &s_vb, enote, input_context, subaddress_map, false)
}

fn scan_core(
    keys: &CarrotKeys,
    s_sr_unctx: &[u8; 32],
    enote: &EnoteScanInput,
    input_context: &[u8],
    subaddress_map: &[([u8; 32], u32, u32)],
    check_janus: bool,
) -> Option<CarrotScanResult> {
    // Step 1: cheap view-tag filter.
    if view_tag(s_sr_unctx, input_context, &enote.onetime_address) != enote.view_tag {
        return None;
    }

    // Step 2: contextualize the shared secret.
    let s_ctx = sender_receiver_secret(s_sr_unctx, &enote.ephemeral_pubkey, input_context);

    // Step 3: the commitment the extensions were bound to. Coinbase
    // outputs carry no outPk; their commitment is the implicit
    // zero-commit over the cleartext amount.
    let bound_commitment = match (enote.commitment, enote.clear_amount) {
        (Some(c), _) => c,
        (None, Some(amount)) => compress(&pedersen::zero_commit(amount)),
        (None, None) => return None,
    };

    // Step 4: recover the address spend key.
    let recovered =
        recover_address_spend_pubkey(&enote.onetime_address, &s_ctx, &bound_commitment)?;

    // Step 5: address table lookup.
    let (is_main, major, minor) = if recovered == keys.account_spend_pubkey {
        (true, 0, 0)
    } else {
        let hit = subaddress_map.iter().find(|(pk, _, _)| *pk == recovered)?;
        (false, hit.1, hit.2)
    };

    // Step 6: amount.
    let amount = match enote.clear_amount {
        Some(a) => a,
        None => decrypt_amount(&enote.encrypted_amount, &s_ctx, &enote.onetime_address),
    };

    // Step 7: recover the mask and check the commitment binding.
    let (mask, etype) = if enote.commitment.is_some() {
        let trial = |etype: u8| -> Option<Scalar> {
            let m = commitment_mask(&s_ctx, amount, &recovered, etype);
            (compress(&pedersen::commit(amount, &m)) == bound_commitment).then_some(m)
        };
        if let Some(m) = trial(enote_type::PAYMENT) {
            (m, enote_type::PAYMENT)
        } else if let Some(m) = trial(enote_type::CHANGE) {
            (m, enote_type::CHANGE)
        } else {
            // Amount decrypted but no mask reproduces outPk: not ours.
            return None;
        }
    } else {
        (Scalar::ONE, enote_type::PAYMENT)
    };

    // Step 8: janus anchor. A mismatching anchor means the sender mixed
    // address components; claiming the output would leak address links.
    if check_janus {
        if let Some(enc_anchor) = &enote.encrypted_anchor {
            let anchor = decrypt_anchor(enc_anchor, &s_ctx, &enote.onetime_address);
            let d_e = carrot::ephemeral_privkey(
                &anchor,
                input_context,
                &recovered,
                &enote.payment_id,
            );
            let normal_ok = carrot::recompute_ephemeral_pubkey(&d_e, &recovered, !is_main)
                .map(|de| de == enote.ephemeral_pubkey)
                .unwrap_or(false);
            let special_ok = anchor
                == special_anchor(
                    &keys.view_incoming_key,
                    &enote.ephemeral_pubkey,
                    input_context,
                    &enote.onetime_address,
                );
            if !normal_ok && !special_ok {
                log::debug!("rejecting output with failed janus anchor check");
                return None;
            }
        }
    }

    Some(CarrotScanResult {
        amount,
        mask,
        enote_type: etype,
        sender_receiver_secret: s_ctx,
        address_spend_pubkey: recovered,
        subaddress_major: major,
        subaddress_minor: minor,
        is_main_address: is_main,
    })
}

/// Twin spend secrets for a scanned CARROT output:
/// `x = k_gi + k^o_g` (G side), `y = k_ps + k^o_t` (T side), so that
/// `Ko = x*G + y*T`.
pub fn derive_spend_keys(
    keys: &CarrotKeys,
    sender_receiver_secret: &[u8; 32],
    commitment: &[u8; 32],
) -> Option<(Scalar, Scalar)> {
    let prove_spend = keys.prove_spend_key?;
    let (k_g, k_t) = onetime_extensions(sender_receiver_secret, commitment);
    Some((keys.generate_image_key + k_g, prove_spend + k_t))
}

//! CARROT enote construction (sender side).
//!
//! Normal payments derive the ephemeral key from a random janus anchor,
//! so a scanner can re-derive it and detect mixed address components.
//! Change and other self-send enotes use a random ephemeral key and
//! carry the "special" anchor derived from the wallet's incoming view
//! key instead.

use curve25519_dalek::scalar::Scalar;

use sal_crypto::carrot::{self, domain, enote_type};
use sal_crypto::carrot_scan;
use sal_crypto::curve::{compress, msm, random_scalar, t_point};
use sal_crypto::pedersen;
use sal_crypto::x25519;

use crate::error::TxError;

/// Everything a finished enote contributes to the transaction.
#[derive(Debug, Clone)]
pub struct BuiltEnote {
    pub onetime_address: [u8; 32],
    pub amount_commitment: [u8; 32],
    pub commitment_mask: Scalar,
    pub encrypted_amount: [u8; 8],
    pub view_tag: [u8; 3],
    pub encrypted_anchor: [u8; 16],
    pub encrypted_payment_id: [u8; 8],
    /// X25519 ephemeral pubkey D_e, stored in the tx extra.
    pub ephemeral_pubkey: [u8; 32],
    pub amount: u64,
    pub enote_type: u8,
}

/// Destination and context for one enote.
pub struct EnoteParams<'a> {
    /// Recipient address spend pubkey `K^j_s`.
    pub recipient_spend_pubkey: &'a [u8; 32],
    /// Recipient address view pubkey (`K^0_v` for a main address,
    /// `K^j_v = k_vi*K^j_s` for a subaddress).
    pub recipient_view_pubkey: &'a [u8; 32],
    pub amount: u64,
    /// 33-byte input context (see `make_input_context_*`).
    pub input_context: &'a [u8],
    pub payment_id: [u8; 8],
    pub is_subaddress: bool,
    /// Coinbase enotes commit with the fixed mask 1 and no outPk.
    pub is_coinbase: bool,
}

/// Build a normal (externally received) payment enote.
pub fn build_payment_enote(params: &EnoteParams) -> Result<BuiltEnote, TxError> {
    let mut anchor = [0u8; 16];
    getrandom::getrandom(&mut anchor)
        .map_err(|e| TxError::Build(format!("randomness unavailable: {e}")))?;

    let d_e = carrot::ephemeral_privkey(
        &anchor,
        params.input_context,
        params.recipient_spend_pubkey,
        &params.payment_id,
    );
    finish_enote(params, &d_e, enote_type::PAYMENT, FinalAnchor::Normal(anchor))
}

/// Build a change/self-send enote. The anchor is the special value bound
/// to `view_incoming_key`, so only the owning wallet passes the janus
/// check for it.
pub fn build_change_enote(
    params: &EnoteParams,
    view_incoming_key: &Scalar,
) -> Result<BuiltEnote, TxError> {
    let d_e = random_scalar();
    finish_enote(
        params,
        &d_e,
        enote_type::CHANGE,
        FinalAnchor::Special(*view_incoming_key),
    )
}

/// Build a coinbase enote to a main address.
pub fn build_coinbase_enote(params: &EnoteParams) -> Result<BuiltEnote, TxError> {
    if !params.is_coinbase {
        return Err(TxError::Build("coinbase enote without coinbase context".into()));
    }
    build_payment_enote(params)
}

enum FinalAnchor {
    /// Cleartext anchor the ephemeral key was derived from.
    Normal([u8; 16]),
    /// Derive the special anchor from this incoming view key.
    Special(Scalar),
}

fn finish_enote(
    params: &EnoteParams,
    d_e: &Scalar,
    etype: u8,
    anchor: FinalAnchor,
) -> Result<BuiltEnote, TxError> {
    // Ephemeral pubkey over the address-dependent base.
    let ephemeral_pubkey =
        carrot::recompute_ephemeral_pubkey(d_e, params.recipient_spend_pubkey, params.is_subaddress)?;

    // Sender-side shared secret: d_e * ConvertPointE(K_v).
    let view_mont = x25519::edwards_to_montgomery_u(params.recipient_view_pubkey)?;
    let s_sr_unctx = x25519::montgomery_ladder(&d_e.to_bytes(), &view_mont);

    let s_ctx =
        carrot_scan::sender_receiver_secret(&s_sr_unctx, &ephemeral_pubkey, params.input_context);

    // Commitment (implicit zero-commit for coinbase).
    let (commitment_mask, amount_commitment) = if params.is_coinbase {
        (Scalar::ONE, compress(&pedersen::zero_commit(params.amount)))
    } else {
        let mask = carrot_scan::commitment_mask(
            &s_ctx,
            params.amount,
            params.recipient_spend_pubkey,
            etype,
        );
        (mask, compress(&pedersen::commit(params.amount, &mask)))
    };

    // One-time address Ko = K^j_s + k_g*G + k_t*T.
    let (k_g, k_t) = carrot_scan::onetime_extensions(&s_ctx, &amount_commitment);
    let ks = sal_crypto::curve::decompress(params.recipient_spend_pubkey)?;
    let ext = msm(
        &[k_g, k_t],
        &[curve25519_dalek::constants::ED25519_BASEPOINT_POINT, *t_point()],
    );
    let onetime_address = compress(&(ks + ext));

    let view_tag = carrot_scan::view_tag(&s_sr_unctx, params.input_context, &onetime_address);

    // Encrypted fields.
    let amount_pad = carrot_scan::amount_mask(&s_ctx, &onetime_address);
    let amount_le = params.amount.to_le_bytes();
    let mut encrypted_amount = [0u8; 8];
    for i in 0..8 {
        encrypted_amount[i] = amount_le[i] ^ amount_pad[i];
    }

    let anchor_clear = match anchor {
        FinalAnchor::Normal(a) => a,
        FinalAnchor::Special(k_vi) => carrot_scan::special_anchor(
            &k_vi,
            &ephemeral_pubkey,
            params.input_context,
            &onetime_address,
        ),
    };
    let anchor_pad = carrot_scan::anchor_mask(&s_ctx, &onetime_address);
    let mut encrypted_anchor = [0u8; 16];
    for i in 0..16 {
        encrypted_anchor[i] = anchor_clear[i] ^ anchor_pad[i];
    }

    let pid_pad = carrot::derive_bytes(
        &s_ctx,
        domain::ENCRYPTION_MASK_PAYMENT_ID,
        &[&onetime_address],
        8,
    );
    let mut encrypted_payment_id = [0u8; 8];
    for i in 0..8 {
        encrypted_payment_id[i] = params.payment_id[i] ^ pid_pad[i];
    }

    Ok(BuiltEnote {
        onetime_address,
        amount_commitment,
        commitment_mask,
        encrypted_amount,
        view_tag,
        encrypted_anchor,
        encrypted_payment_id,
        ephemeral_pubkey,
        amount: params.amount,
        enote_type: etype,
    })
}

/// Coinbase input context: `'C' || height_LE(8) || zeros(24)`.
pub fn make_input_context_coinbase(height: u64) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(33);
    ctx.push(b'C');
    ctx.extend_from_slice(&height.to_le_bytes());
    ctx.extend_from_slice(&[0u8; 24]);
    ctx
}

/// RCT input context: `'R' || first_key_image(32)`.
pub fn make_input_context_rct(first_key_image: &[u8; 32]) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(33);
    ctx.push(b'R');
    ctx.extend_from_slice(first_key_image);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_context_layouts() {
        let c = make_input_context_coinbase(12345);
        assert_eq!(c.len(), 33);
        assert_eq!(c[0], b'C');
        assert_eq!(u64::from_le_bytes(c[1..9].try_into().unwrap()), 12345);
        assert!(c[9..].iter().all(|&b| b == 0));

        let r = make_input_context_rct(&[0xAA; 32]);
        assert_eq!(r.len(), 33);
        assert_eq!(r[0], b'R');
        assert_eq!(&r[1..], &[0xAA; 32]);
    }

    #[test]
    fn enote_structure_is_complete() {
        let keys = sal_crypto::carrot::CarrotKeys::from_master(&[7; 32]);
        let ctx = make_input_context_coinbase(5);
        let params = EnoteParams {
            recipient_spend_pubkey: &keys.account_spend_pubkey,
            recipient_view_pubkey: &keys.primary_address_view_pubkey,
            amount: 1_000_000,
            input_context: &ctx,
            payment_id: [0u8; 8],
            is_subaddress: false,
            is_coinbase: false,
        };
        let enote = build_payment_enote(&params).unwrap();
        assert_ne!(enote.onetime_address, [0u8; 32]);
        assert_ne!(enote.ephemeral_pubkey, [0u8; 32]);
        // Commitment must re-open under the derived mask.
        assert_eq!(
            compress(&pedersen::commit(1_000_000, &enote.commitment_mask)),
            enote.amount_commitment
        );
    }

    // Cross-checking against the scanner lives in tests/carrot_roundtrip.rs.
}

//! RCT verification: structural checks, balance, range proofs, ring
//! signatures.
//!
//! The chain context (ring member keys and commitments, resolved from
//! the global output indices) is injected by the caller; everything else
//! comes from the transaction itself.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::traits::Identity;

use sal_crypto::curve::{decompress, h_point, inv_eight};
use sal_crypto::{bulletproofs_plus, clsag, tclsag};
use sal_types::{rct_type, tx_type, AssetType};

use crate::error::TxError;
use crate::fee::minimum_slippage;
use crate::hashing::signature_message;
use crate::types::{RctPrunable, Transaction, TxInput};

/// Resolved ring for one input.
pub struct RingMembers {
    pub keys: Vec<[u8; 32]>,
    pub commitments: Vec<[u8; 32]>,
}

/// Stateless consistency checks: counts, type/version pairing, asset
/// rules. Cheap; run before fetching any chain context.
pub fn verify_semantics(tx: &Transaction) -> Result<(), TxError> {
    let prefix = &tx.prefix;

    let Some(rct) = &tx.rct else {
        if prefix.version != 1 {
            return Err(TxError::ProtocolViolation("v2+ tx without rct section".into()));
        }
        return Ok(());
    };

    if rct.is_null() {
        let coinbase_like =
            prefix.tx_type == tx_type::MINER || prefix.tx_type == tx_type::PROTOCOL;
        if !coinbase_like {
            return Err(TxError::ProtocolViolation(
                "null rct outside miner/protocol tx".into(),
            ));
        }
        return Ok(());
    }

    if rct.rct_type == rct_type::SALVIUM_ONE && prefix.version < 4 {
        return Err(TxError::ProtocolViolation(
            "SalviumOne signatures require tx version 4".into(),
        ));
    }

    let vout = prefix.vout.len();
    if rct.ecdh_amounts.len() != vout || rct.out_pk.len() != vout {
        return Err(TxError::ProtocolViolation(
            "per-output rct vectors disagree with vout".into(),
        ));
    }
    if vout == 0 || vout > bulletproofs_plus::MAX_OUTPUTS {
        return Err(TxError::ProtocolViolation("output count out of range".into()));
    }

    let key_inputs = prefix
        .vin
        .iter()
        .filter(|i| matches!(i, TxInput::ToKey { .. }))
        .count();
    if key_inputs == 0 || key_inputs != prefix.vin.len() {
        return Err(TxError::ProtocolViolation(
            "rct tx must spend key inputs only".into(),
        ));
    }

    let Some(prunable) = &rct.prunable else {
        // Pruned transactions can only be semantically checked.
        return Ok(());
    };
    check_prunable_shape(rct.rct_type, prunable, key_inputs)?;

    // Conversion rules.
    if prefix.tx_type == tx_type::CONVERT {
        let src = AssetType::from_str_opt(&prefix.source_asset_type);
        let dst = AssetType::from_str_opt(&prefix.destination_asset_type);
        match (src, dst) {
            (Some(s), Some(d)) if AssetType::is_valid_conversion(s, d) => {}
            _ => {
                return Err(TxError::ProtocolViolation(format!(
                    "invalid conversion pair {} -> {}",
                    prefix.source_asset_type, prefix.destination_asset_type
                )))
            }
        }
        if prefix.amount_burnt == 0 {
            return Err(TxError::ProtocolViolation("conversion burns nothing".into()));
        }
        if prefix.amount_slippage_limit < minimum_slippage(prefix.amount_burnt) {
            return Err(TxError::ProtocolViolation(
                "slippage limit below the 1/32 floor".into(),
            ));
        }
    }

    Ok(())
}

fn check_prunable_shape(
    rct_ty: u8,
    prunable: &RctPrunable,
    input_count: usize,
) -> Result<(), TxError> {
    if prunable.pseudo_outs.len() != input_count {
        return Err(TxError::ProtocolViolation("pseudo-out per input required".into()));
    }
    if prunable.bulletproofs_plus.is_empty() {
        return Err(TxError::ProtocolViolation("missing range proof".into()));
    }
    match rct_ty {
        rct_type::SALVIUM_ONE => {
            if prunable.tclsags.len() != input_count || !prunable.clsags.is_empty() {
                return Err(TxError::ProtocolViolation(
                    "SalviumOne requires one TCLSAG per input".into(),
                ));
            }
        }
        _ => {
            if prunable.clsags.len() != input_count || !prunable.tclsags.is_empty() {
                return Err(TxError::ProtocolViolation(
                    "expected one CLSAG per input".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Full verification against resolved ring members.
pub fn verify_rct(tx: &Transaction, rings: &[RingMembers]) -> Result<(), TxError> {
    verify_semantics(tx)?;

    let rct = tx
        .rct
        .as_ref()
        .ok_or_else(|| TxError::ProtocolViolation("no rct section".into()))?;
    if rct.is_null() {
        return Ok(());
    }
    let prunable = rct
        .prunable
        .as_ref()
        .ok_or_else(|| TxError::ProtocolViolation("cannot verify pruned tx".into()))?;
    if rings.len() != tx.prefix.vin.len() {
        return Err(TxError::ProtocolViolation("ring context per input required".into()));
    }

    // Balance: sum(pseudoOuts) == sum(outPk) + fee*H + burnt*H.
    let mut lhs = EdwardsPoint::identity();
    for po in &prunable.pseudo_outs {
        lhs += decompress(po)?;
    }
    let mut rhs = EdwardsPoint::identity();
    for pk in &rct.out_pk {
        rhs += decompress(pk)?;
    }
    let implied = rct
        .txn_fee
        .checked_add(tx.prefix.amount_burnt)
        .ok_or_else(|| TxError::ProtocolViolation("fee + burnt overflows".into()))?;
    rhs += h_point() * curve25519_dalek::scalar::Scalar::from(implied);
    if lhs != rhs {
        return Err(TxError::InvalidProof("commitment balance mismatch".into()));
    }

    // Range proofs: V restored from outPk / 8.
    let v: Vec<EdwardsPoint> = rct
        .out_pk
        .iter()
        .map(|pk| Ok::<_, TxError>(decompress(pk)? * inv_eight()))
        .collect::<Result<_, _>>()?;
    let proof = &prunable.bulletproofs_plus[0];
    if prunable.bulletproofs_plus.len() != 1 {
        return Err(TxError::InvalidProof("expected a single aggregate proof".into()));
    }
    bulletproofs_plus::verify(&v, proof)
        .map_err(|e| TxError::InvalidProof(format!("range proof: {e}")))?;

    // Ring signatures.
    let message = signature_message(tx)
        .ok_or_else(|| TxError::ProtocolViolation("no signable message".into()))?;

    for (i, input) in tx.prefix.vin.iter().enumerate() {
        let TxInput::ToKey { key_image, key_offsets, .. } = input else {
            return Err(TxError::ProtocolViolation("unexpected coinbase input".into()));
        };
        let ring = &rings[i];
        if ring.keys.len() != key_offsets.len() || ring.commitments.len() != key_offsets.len() {
            return Err(TxError::ProtocolViolation("ring size mismatch".into()));
        }
        if !sal_crypto::curve::key_image_is_valid(key_image) {
            return Err(TxError::InvalidProof(format!("input {i}: invalid key image")));
        }

        let pseudo = &prunable.pseudo_outs[i];
        if rct.rct_type == rct_type::SALVIUM_ONE {
            let sig = &prunable.tclsags[i];
            let full = tclsag::Tclsag {
                sx: sig.sx.clone(),
                sy: sig.sy.clone(),
                c1: sig.c1,
                key_image: *key_image,
                commitment_image: sig.d,
            };
            tclsag::verify(&message, &full, &ring.keys, &ring.commitments, pseudo)
                .map_err(|e| TxError::InvalidProof(format!("input {i}: {e}")))?;
        } else {
            let sig = &prunable.clsags[i];
            let full = clsag::Clsag {
                s: sig.s.clone(),
                c1: sig.c1,
                key_image: *key_image,
                commitment_image: sig.d,
            };
            clsag::verify(&message, &full, &ring.keys, &ring.commitments, pseudo)
                .map_err(|e| TxError::InvalidProof(format!("input {i}: {e}")))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    #[test]
    fn v2_without_rct_is_invalid() {
        let tx = Transaction {
            prefix: TxPrefix { version: 2, ..TxPrefix::default() },
            rct: None,
        };
        assert!(verify_semantics(&tx).is_err());
    }

    #[test]
    fn null_rct_only_for_miner_or_protocol() {
        let mut tx = Transaction {
            prefix: TxPrefix {
                version: 4,
                tx_type: tx_type::MINER,
                ..TxPrefix::default()
            },
            rct: Some(RctSignature::default()),
        };
        verify_semantics(&tx).unwrap();
        tx.prefix.tx_type = tx_type::TRANSFER;
        assert!(verify_semantics(&tx).is_err());
    }

    #[test]
    fn salvium_one_needs_v4() {
        let tx = Transaction {
            prefix: TxPrefix {
                version: 2,
                tx_type: tx_type::TRANSFER,
                vin: vec![TxInput::ToKey {
                    amount: 0,
                    asset_type: "SAL1".into(),
                    key_offsets: vec![1, 1],
                    key_image: [1u8; 32],
                }],
                vout: vec![TxOutput {
                    amount: 0,
                    target: TxOutTarget::CarrotV1 {
                        key: [0u8; 32],
                        asset_type: "SAL1".into(),
                        view_tag: [0; 3],
                        encrypted_janus_anchor: [0; 16],
                    },
                }],
                ..TxPrefix::default()
            },
            rct: Some(RctSignature {
                rct_type: rct_type::SALVIUM_ONE,
                ecdh_amounts: vec![[0u8; 8]],
                out_pk: vec![[0u8; 32]],
                ..RctSignature::default()
            }),
        };
        assert!(verify_semantics(&tx).is_err());
    }
}

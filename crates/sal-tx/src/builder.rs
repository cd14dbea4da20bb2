//! RCT transaction assembly and signing.
//!
//! The builder consumes owned outputs (with their ring material already
//! resolved against the chain), payment destinations, and the sender's
//! CARROT keys for change. It produces a fully signed v4 transaction:
//! CARROT enotes, Bulletproofs+ over all output amounts, one TCLSAG per
//! CARROT-spending input (CLSAG for legacy inputs), and balanced
//! pseudo-output commitments.

use curve25519_dalek::scalar::Scalar;

use sal_crypto::carrot::CarrotKeys;
use sal_crypto::curve::{compress, random_scalar};
use sal_crypto::{bulletproofs_plus, clsag, pedersen, tclsag};
use sal_types::consensus::FeePriority;
use sal_types::{rct_type, tx_type, txout_tag, AssetType};

use crate::carrot::{build_change_enote, build_payment_enote, make_input_context_rct, BuiltEnote, EnoteParams};
use crate::codec::{serialize_rct_base, serialize_tx_prefix};
use crate::decoy::absolute_to_offsets;
use crate::error::TxError;
use crate::extra::{build_extra, encrypted_payment_id_nonce, ephemeral_pubkey_entries};
use crate::fee::{compute_fee, minimum_slippage};
use crate::hashing::{bpp_transcript_bytes, signature_message_parts, tx_hash};
use crate::types::*;

/// Secret material for one spent output.
#[derive(Clone)]
pub enum InputSecret {
    /// Legacy one-time key: signs with CLSAG.
    Legacy { x: Scalar },
    /// CARROT twin key `(x, y)` with `Ko = x*G + y*T`: signs with TCLSAG.
    Carrot { x: Scalar, y: Scalar },
}

/// An owned output being spent, with its ring fully resolved.
#[derive(Clone)]
pub struct SpendInput {
    pub amount: u64,
    pub asset_type: String,
    pub key_image: [u8; 32],
    /// Commitment mask of the spent output.
    pub mask: Scalar,
    pub secret: InputSecret,
    /// Sorted absolute global indices of the ring (real included).
    pub ring_indices: Vec<u64>,
    pub real_position: usize,
    /// One-time keys of the ring members, same order.
    pub ring_keys: Vec<[u8; 32]>,
    /// Commitments of the ring members, same order.
    pub ring_commitments: Vec<[u8; 32]>,
}

/// One payment target.
#[derive(Clone)]
pub struct Destination {
    pub spend_pubkey: [u8; 32],
    pub view_pubkey: [u8; 32],
    pub amount: u64,
    pub is_subaddress: bool,
}

/// Transaction-wide options.
pub struct BuildOptions {
    pub tx_type: u8,
    pub source_asset: AssetType,
    pub destination_asset: AssetType,
    /// Burnt amount for CONVERT / BURN / STAKE; 0 otherwise.
    pub amount_burnt: u64,
    /// Caller-chosen slippage bound; must cover the 1/32 floor on
    /// conversions.
    pub amount_slippage_limit: u64,
    pub priority: FeePriority,
    pub payment_id: Option<[u8; 8]>,
    /// Return address recorded per output in the v3+ list.
    pub return_address: [u8; 32],
}

impl BuildOptions {
    pub fn transfer(asset: AssetType, return_address: [u8; 32]) -> Self {
        Self {
            tx_type: tx_type::TRANSFER,
            source_asset: asset,
            destination_asset: asset,
            amount_burnt: 0,
            amount_slippage_limit: 0,
            priority: FeePriority::Normal,
            payment_id: None,
            return_address,
        }
    }
}

/// A signed transaction plus the bookkeeping the wallet needs.
pub struct BuiltTransaction {
    pub tx: Transaction,
    pub tx_hash: [u8; 32],
    pub fee: u64,
    /// All enotes in output order (payments first, change last).
    pub enotes: Vec<BuiltEnote>,
}

const TX_VERSION: u64 = 4;

pub fn build_transaction(
    mut inputs: Vec<SpendInput>,
    destinations: &[Destination],
    sender_keys: &CarrotKeys,
    options: &BuildOptions,
) -> Result<BuiltTransaction, TxError> {
    validate_request(&inputs, destinations, options)?;

    let use_tclsag = inputs
        .iter()
        .any(|i| matches!(i.secret, InputSecret::Carrot { .. }));
    let rct_ty = if use_tclsag { rct_type::SALVIUM_ONE } else { rct_type::BULLETPROOF_PLUS };

    // Consensus orders inputs by key image, descending.
    inputs.sort_by(|a, b| b.key_image.cmp(&a.key_image));

    let ring_size = inputs[0].ring_keys.len();
    let num_outputs = destinations.len() + 1; // + change
    let fee = compute_fee(
        inputs.len(),
        num_outputs,
        ring_size,
        use_tclsag,
        txout_tag::CARROT_V1,
        options.priority,
    );

    let total_in: u64 = inputs.iter().map(|i| i.amount).sum();
    let total_out: u64 = destinations.iter().map(|d| d.amount).sum();
    let needed = total_out
        .checked_add(fee)
        .and_then(|v| v.checked_add(options.amount_burnt))
        .ok_or_else(|| TxError::Build("amount overflow".into()))?;
    if total_in < needed {
        return Err(TxError::Build(format!(
            "insufficient inputs: have {total_in}, need {needed}"
        )));
    }
    let change_amount = total_in - needed;

    // CARROT input context is seeded by the first (sorted) key image.
    let input_context = make_input_context_rct(&inputs[0].key_image);

    // Payment enotes, then change back to the sender's main address.
    let payment_id = options.payment_id.unwrap_or([0u8; 8]);
    let mut enotes: Vec<BuiltEnote> = Vec::with_capacity(num_outputs);
    for dest in destinations {
        enotes.push(build_payment_enote(&EnoteParams {
            recipient_spend_pubkey: &dest.spend_pubkey,
            recipient_view_pubkey: &dest.view_pubkey,
            amount: dest.amount,
            input_context: &input_context,
            payment_id,
            is_subaddress: dest.is_subaddress,
            is_coinbase: false,
        })?);
    }
    enotes.push(build_change_enote(
        &EnoteParams {
            recipient_spend_pubkey: &sender_keys.account_spend_pubkey,
            recipient_view_pubkey: &sender_keys.primary_address_view_pubkey,
            amount: change_amount,
            input_context: &input_context,
            payment_id: [0u8; 8],
            is_subaddress: false,
            is_coinbase: false,
        },
        &sender_keys.view_incoming_key,
    )?);

    // Extra: ephemeral pubkeys plus the encrypted payment id.
    let mut extra_entries =
        ephemeral_pubkey_entries(&enotes.iter().map(|e| e.ephemeral_pubkey).collect::<Vec<_>>())?;
    extra_entries.push(encrypted_payment_id_nonce(&enotes[0].encrypted_payment_id));
    let extra = build_extra(&extra_entries);

    // Prefix. The tx's own outputs stay in the source asset; converted
    // funds materialize later through a protocol tx.
    let asset_str = options.source_asset.as_str().to_string();
    let vout: Vec<TxOutput> = enotes
        .iter()
        .map(|e| TxOutput {
            amount: 0,
            target: TxOutTarget::CarrotV1 {
                key: e.onetime_address,
                asset_type: asset_str.clone(),
                view_tag: e.view_tag,
                encrypted_janus_anchor: e.encrypted_anchor,
            },
        })
        .collect();

    let vin: Vec<TxInput> = inputs
        .iter()
        .map(|i| TxInput::ToKey {
            amount: 0,
            asset_type: options.source_asset.as_str().to_string(),
            key_offsets: absolute_to_offsets(&i.ring_indices),
            key_image: i.key_image,
        })
        .collect();

    let mut prefix = TxPrefix {
        version: TX_VERSION,
        unlock_time: 0,
        vin,
        vout,
        extra,
        tx_type: options.tx_type,
        amount_burnt: options.amount_burnt,
        source_asset_type: options.source_asset.as_str().into(),
        destination_asset_type: options.destination_asset.as_str().into(),
        amount_slippage_limit: options.amount_slippage_limit,
        ..TxPrefix::default()
    };
    if options.tx_type == tx_type::TRANSFER {
        // v3+ transfers carry one return address per output, with the
        // change output flagged in the mask (bit per output, LSB first).
        prefix.return_address_list = vec![options.return_address; enotes.len()];
        let mut change_mask = vec![0u8; enotes.len().div_ceil(8)];
        let change_index = enotes.len() - 1;
        change_mask[change_index / 8] |= 1 << (change_index % 8);
        prefix.return_address_change_mask = change_mask;
    } else {
        // Conversions and burns use the single legacy return slot.
        prefix.return_address = Some(options.return_address);
        prefix.return_pubkey = Some([0u8; 32]);
    }

    // Range proof over every output amount.
    let amounts: Vec<u64> = enotes.iter().map(|e| e.amount).collect();
    let masks: Vec<Scalar> = enotes.iter().map(|e| e.commitment_mask).collect();
    let proof = bulletproofs_plus::prove(&amounts, &masks)?;

    // Pseudo-output masks balance against the output masks; fee and
    // burnt amount commit with a zero mask.
    let out_mask_sum: Scalar = masks.iter().sum();
    let mut pseudo_masks: Vec<Scalar> = (0..inputs.len() - 1).map(|_| random_scalar()).collect();
    let partial: Scalar = pseudo_masks.iter().sum();
    pseudo_masks.push(out_mask_sum - partial);

    let pseudo_outs: Vec<[u8; 32]> = inputs
        .iter()
        .zip(&pseudo_masks)
        .map(|(input, mask)| compress(&pedersen::commit(input.amount, mask)))
        .collect();

    // RCT signature skeleton (signatures filled in below).
    let mut rct = RctSignature {
        rct_type: rct_ty,
        txn_fee: fee,
        ecdh_amounts: enotes.iter().map(|e| e.encrypted_amount).collect(),
        out_pk: enotes.iter().map(|e| e.amount_commitment).collect(),
        p_r: identity_point_bytes(),
        salvium_data: salvium_data_for(rct_ty),
        prunable: Some(RctPrunable {
            bulletproofs_plus: vec![proof],
            clsags: Vec::new(),
            tclsags: Vec::new(),
            pseudo_outs: pseudo_outs.clone(),
        }),
    };

    // Signature message binds prefix, base, and the proof elements.
    let prefix_hash = sal_crypto::keccak256(&serialize_tx_prefix(&prefix));
    let base_bytes = serialize_rct_base(&rct);
    let bpp_bytes = bpp_transcript_bytes(
        &rct.prunable.as_ref().expect("prunable was just built").bulletproofs_plus,
    );
    let message = signature_message_parts(&prefix_hash, &base_bytes, &bpp_bytes);

    // Ring signatures.
    for (i, input) in inputs.iter().enumerate() {
        let z = input.mask - pseudo_masks[i];
        match &input.secret {
            InputSecret::Legacy { x } => {
                let sig = clsag::sign(
                    &message,
                    &input.ring_keys,
                    &input.ring_commitments,
                    x,
                    &z,
                    &pseudo_outs[i],
                    input.real_position,
                )?;
                debug_assert_eq!(sig.key_image, input.key_image);
                rct.prunable.as_mut().expect("prunable present").clsags.push(ClsagSig {
                    s: sig.s,
                    c1: sig.c1,
                    d: sig.commitment_image,
                });
            }
            InputSecret::Carrot { x, y } => {
                let sig = tclsag::sign(
                    &message,
                    &input.ring_keys,
                    &input.ring_commitments,
                    x,
                    y,
                    &z,
                    &pseudo_outs[i],
                    input.real_position,
                )?;
                debug_assert_eq!(sig.key_image, input.key_image);
                rct.prunable.as_mut().expect("prunable present").tclsags.push(TclsagSig {
                    sx: sig.sx,
                    sy: sig.sy,
                    c1: sig.c1,
                    d: sig.commitment_image,
                });
            }
        }
    }

    let tx = Transaction { prefix, rct: Some(rct) };
    let hash = tx_hash(&tx);
    log::debug!(
        "built {} tx {} with {} inputs, {} outputs, fee {}",
        if use_tclsag { "SalviumOne" } else { "BulletproofPlus" },
        hex::encode(hash),
        inputs.len(),
        num_outputs,
        fee,
    );

    Ok(BuiltTransaction { tx, tx_hash: hash, fee, enotes })
}

fn validate_request(
    inputs: &[SpendInput],
    destinations: &[Destination],
    options: &BuildOptions,
) -> Result<(), TxError> {
    if inputs.is_empty() {
        return Err(TxError::Build("no inputs".into()));
    }
    if destinations.is_empty() {
        return Err(TxError::Build("no destinations".into()));
    }
    if destinations.len() + 1 > bulletproofs_plus::MAX_OUTPUTS {
        return Err(TxError::Build("too many outputs".into()));
    }
    for input in inputs {
        let n = input.ring_keys.len();
        if n == 0
            || n != input.ring_commitments.len()
            || n != input.ring_indices.len()
            || input.real_position >= n
        {
            return Err(TxError::Build("inconsistent ring material".into()));
        }
    }

    match options.tx_type {
        tx_type::TRANSFER => {
            if options.source_asset != options.destination_asset {
                return Err(TxError::ProtocolViolation(
                    "transfer cannot change asset type".into(),
                ));
            }
        }
        tx_type::CONVERT => {
            if !AssetType::is_valid_conversion(options.source_asset, options.destination_asset) {
                return Err(TxError::ProtocolViolation(format!(
                    "no oracle pair {} -> {}",
                    options.source_asset, options.destination_asset
                )));
            }
            if options.amount_burnt == 0 {
                return Err(TxError::ProtocolViolation("conversion burns nothing".into()));
            }
            if options.amount_slippage_limit < minimum_slippage(options.amount_burnt) {
                return Err(TxError::ProtocolViolation(
                    "slippage limit below the 1/32 floor".into(),
                ));
            }
        }
        tx_type::BURN | tx_type::STAKE => {
            if options.amount_burnt == 0 {
                return Err(TxError::ProtocolViolation("burn amount is zero".into()));
            }
        }
        other => {
            return Err(TxError::ProtocolViolation(format!(
                "builder cannot produce tx type {other}"
            )));
        }
    }
    Ok(())
}

fn salvium_data_for(rct_ty: u8) -> Option<SalviumData> {
    match rct_ty {
        rct_type::SALVIUM_ZERO | rct_type::SALVIUM_ONE => Some(SalviumData::Versioned {
            data_type: 0,
            pr_proof: ZkProof::default(),
            sa_proof: ZkProof::default(),
            audit: None,
        }),
        _ => None,
    }
}

/// Compressed Ed25519 identity.
pub(crate) fn identity_point_bytes() -> [u8; 32] {
    let mut b = [0u8; 32];
    b[0] = 1;
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_bad_requests() {
        let keys = CarrotKeys::from_master(&[1; 32]);
        let dest = Destination {
            spend_pubkey: keys.account_spend_pubkey,
            view_pubkey: keys.primary_address_view_pubkey,
            amount: 10,
            is_subaddress: false,
        };
        let opts = BuildOptions::transfer(AssetType::Sal1, [0u8; 32]);
        assert!(build_transaction(vec![], &[dest], &keys, &opts).is_err());
    }

    #[test]
    fn conversion_requires_valid_pair_and_slippage() {
        let mut opts = BuildOptions::transfer(AssetType::Sal1, [0u8; 32]);
        opts.tx_type = tx_type::CONVERT;
        opts.amount_burnt = 3200;
        opts.amount_slippage_limit = 99; // floor is 100
        opts.destination_asset = AssetType::Vsd;
        let err = validate_request(
            &[dummy_input()],
            &[dummy_dest()],
            &opts,
        )
        .unwrap_err();
        assert!(matches!(err, TxError::ProtocolViolation(_)));

        opts.amount_slippage_limit = 100;
        validate_request(&[dummy_input()], &[dummy_dest()], &opts).unwrap();

        opts.destination_asset = AssetType::Sal1;
        assert!(validate_request(&[dummy_input()], &[dummy_dest()], &opts).is_err());
    }

    fn dummy_input() -> SpendInput {
        SpendInput {
            amount: 100_000,
            asset_type: "SAL1".into(),
            key_image: [1u8; 32],
            mask: Scalar::ONE,
            secret: InputSecret::Legacy { x: Scalar::ONE },
            ring_indices: vec![0, 1],
            real_position: 0,
            ring_keys: vec![[0u8; 32]; 2],
            ring_commitments: vec![[0u8; 32]; 2],
        }
    }

    fn dummy_dest() -> Destination {
        Destination {
            spend_pubkey: [2u8; 32],
            view_pubkey: [3u8; 32],
            amount: 10,
            is_subaddress: false,
        }
    }

    // Full build/verify exercises live in tests/build_and_verify.rs.
}

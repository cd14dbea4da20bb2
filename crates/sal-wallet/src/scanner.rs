//! Per-transaction output scanning.
//!
//! Routes each output to the right pipeline: CARROT v1 targets go
//! through the X25519 seven-step scan, plain and tagged keys through the
//! legacy ECDH derivation. Matches become [`WalletOutput`] records with
//! key images when the wallet can spend.

use curve25519_dalek::scalar::Scalar;

use sal_crypto::carrot_scan::{self, EnoteScanInput};
use sal_crypto::curve::compress;
use sal_crypto::derive;
use sal_crypto::pedersen;
use sal_crypto::subaddress;
use sal_tx::carrot::{make_input_context_coinbase, make_input_context_rct};
use sal_tx::extra::{self, ExtraEntry};
use sal_tx::types::{RctSignature, Transaction, TxOutTarget};
use sal_types::tx_type;

use crate::error::WalletError;
use crate::keys::WalletKeys;
use crate::store::WalletOutput;

/// Keys plus precomputed subaddress lookup tables.
pub struct ScanContext {
    pub keys: WalletKeys,
    pub legacy_map: Vec<([u8; 32], u32, u32)>,
    pub carrot_map: Vec<([u8; 32], u32, u32)>,
}

impl ScanContext {
    /// Build lookup tables covering `major_max` x `minor_max` indices.
    pub fn new(keys: WalletKeys, major_max: u32, minor_max: u32) -> Result<Self, WalletError> {
        let legacy_map = subaddress::cn_subaddress_map(
            &keys.legacy.spend_public,
            &keys.legacy.view_secret,
            major_max,
            minor_max,
        )?;
        let carrot_map = subaddress::carrot_subaddress_map(&keys.carrot, major_max, minor_max)?;
        Ok(Self { keys, legacy_map, carrot_map })
    }
}

/// Block-level context for one transaction.
pub struct TxContext<'a> {
    pub tx_hash: [u8; 32],
    pub block_height: u64,
    pub is_coinbase: bool,
    /// Global index per output, daemon-provided.
    pub output_indices: &'a [u64],
}

/// Scan every output of `tx`; returns the outputs we own.
pub fn scan_transaction(
    ctx: &ScanContext,
    tx: &Transaction,
    meta: &TxContext,
) -> Result<Vec<WalletOutput>, WalletError> {
    let entries = extra::parse_extra(&tx.prefix.extra);
    let tx_pubkey = extra::find_tx_pubkey(&entries);
    let additional = entries.iter().find_map(|e| match e {
        ExtraEntry::AdditionalPubkeys(keys) => Some(keys.clone()),
        _ => None,
    });

    // CARROT input context.
    let input_context = if meta.is_coinbase {
        make_input_context_coinbase(meta.block_height)
    } else {
        tx.prefix
            .first_key_image()
            .map(|ki| make_input_context_rct(ki))
            .unwrap_or_default()
    };

    // Legacy ECDH shared point (fails harmlessly for CARROT-only txs
    // whose pubkey is an X25519 point).
    let legacy_derivation = tx_pubkey.and_then(|pk| {
        derive::key_derivation(&pk, &ctx.keys.legacy.view_secret).ok()
    });

    let rct = tx.rct.as_ref();
    let mut found = Vec::new();

    for (index, output) in tx.prefix.vout.iter().enumerate() {
        let global_index = meta.output_indices.get(index).copied().unwrap_or(0);
        let record = match &output.target {
            TxOutTarget::CarrotV1 { key, asset_type, view_tag, encrypted_janus_anchor } => {
                let ephemeral = additional
                    .as_ref()
                    .and_then(|keys| keys.get(index).copied())
                    .or(tx_pubkey);
                let Some(ephemeral) = ephemeral else { continue };
                if input_context.is_empty() {
                    continue;
                }
                scan_carrot_output(
                    ctx,
                    CarrotOutputData {
                        onetime_address: *key,
                        view_tag: *view_tag,
                        encrypted_anchor: *encrypted_janus_anchor,
                        ephemeral_pubkey: ephemeral,
                        asset_type,
                        clear_amount: (output.amount != 0).then_some(output.amount),
                        index: index as u32,
                        rct,
                    },
                    &input_context,
                    meta,
                    global_index,
                    tx.prefix.unlock_time,
                )
            }
            TxOutTarget::Key { key, asset_type, unlock_time } => scan_legacy_output(
                ctx,
                legacy_derivation.as_ref(),
                *key,
                None,
                asset_type,
                *unlock_time,
                output.amount,
                index as u32,
                rct,
                meta,
                global_index,
            ),
            TxOutTarget::TaggedKey { key, asset_type, unlock_time, view_tag } => {
                scan_legacy_output(
                    ctx,
                    legacy_derivation.as_ref(),
                    *key,
                    Some(*view_tag),
                    asset_type,
                    *unlock_time,
                    output.amount,
                    index as u32,
                    rct,
                    meta,
                    global_index,
                )
            }
        };
        if let Some(record) = record {
            found.push(record);
        }
    }

    if !found.is_empty() {
        log::debug!(
            "tx {}: found {} owned output(s) at height {}",
            hex::encode(meta.tx_hash),
            found.len(),
            meta.block_height
        );
    }
    Ok(found)
}

struct CarrotOutputData<'a> {
    onetime_address: [u8; 32],
    view_tag: [u8; 3],
    encrypted_anchor: [u8; 16],
    ephemeral_pubkey: [u8; 32],
    asset_type: &'a str,
    clear_amount: Option<u64>,
    index: u32,
    rct: Option<&'a RctSignature>,
}

fn scan_carrot_output(
    ctx: &ScanContext,
    data: CarrotOutputData,
    input_context: &[u8],
    meta: &TxContext,
    global_index: u64,
    unlock_time: u64,
) -> Option<WalletOutput> {
    let commitment = data
        .rct
        .filter(|r| !r.is_null())
        .and_then(|r| r.out_pk.get(data.index as usize).copied());
    let encrypted_amount = data
        .rct
        .and_then(|r| r.ecdh_amounts.get(data.index as usize).copied())
        .unwrap_or([0u8; 8]);

    let enote = EnoteScanInput {
        onetime_address: data.onetime_address,
        view_tag: data.view_tag,
        ephemeral_pubkey: data.ephemeral_pubkey,
        encrypted_amount,
        commitment,
        encrypted_anchor: Some(data.encrypted_anchor),
        clear_amount: data.clear_amount,
        payment_id: [0u8; 8],
    };

    let result =
        carrot_scan::scan_external(&ctx.keys.carrot, &enote, input_context, &ctx.carrot_map)?;

    // The commitment the record opens against: outPk, or the implicit
    // coinbase zero-commit.
    let commitment_bytes = commitment
        .unwrap_or_else(|| compress(&pedersen::zero_commit(result.amount)));

    // Key image needs the twin spend keys (full wallets only).
    let key_image = carrot_scan::derive_spend_keys(
        &ctx.keys.carrot,
        &result.sender_receiver_secret,
        &commitment_bytes,
    )
    .map(|(x, _y)| derive::generate_key_image(&data.onetime_address, &x));

    Some(WalletOutput {
        key_image,
        public_key: data.onetime_address,
        tx_hash: meta.tx_hash,
        output_index: data.index,
        global_index,
        block_height: meta.block_height,
        unlock_time,
        amount: result.amount,
        asset_type: data.asset_type.to_string(),
        mask: result.mask,
        commitment: commitment_bytes,
        subaddress_major: result.subaddress_major,
        subaddress_minor: result.subaddress_minor,
        is_carrot: true,
        carrot_enote_type: Some(result.enote_type),
        carrot_shared_secret: Some(result.sender_receiver_secret),
        is_spent: false,
        spent_height: None,
        spent_tx: None,
        is_frozen: false,
    })
}

#[allow(clippy::too_many_arguments)]
fn scan_legacy_output(
    ctx: &ScanContext,
    derivation: Option<&[u8; 32]>,
    output_key: [u8; 32],
    view_tag: Option<u8>,
    asset_type: &str,
    unlock_time: u64,
    clear_amount: u64,
    index: u32,
    rct: Option<&RctSignature>,
    meta: &TxContext,
    global_index: u64,
) -> Option<WalletOutput> {
    let derivation = derivation?;

    // View-tag fast reject.
    if let Some(tag) = view_tag {
        if derive::derive_view_tag(derivation, index) != tag {
            return None;
        }
    }

    // Recover the owning subaddress: B' = Ko - H_s(D || i)*G.
    let ko = sal_crypto::curve::decompress(&output_key).ok()?;
    let h = derive::derivation_to_scalar(derivation, index);
    let candidate = compress(&(ko - sal_crypto::curve::mul_base(&h)));
    let (_, major, minor) = ctx
        .legacy_map
        .iter()
        .find(|(pk, _, _)| *pk == candidate)
        .copied()?;

    // Amount and mask.
    let rct_active = rct.map(|r| !r.is_null()).unwrap_or(false) && !meta.is_coinbase;
    let (amount, mask, commitment) = if rct_active {
        let r = rct?;
        let encrypted = r.ecdh_amounts.get(index as usize)?;
        let shared = h.to_bytes();
        let amount = derive::decode_amount(encrypted, &shared);
        let mask = pedersen::gen_commitment_mask(&shared);
        let commitment = *r.out_pk.get(index as usize)?;
        // Reject on commitment mismatch: not our output after all.
        if compress(&pedersen::commit(amount, &mask)) != commitment {
            return None;
        }
        (amount, mask, commitment)
    } else {
        let commitment = compress(&pedersen::zero_commit(clear_amount));
        (clear_amount, Scalar::ONE, commitment)
    };

    // Key image for spend-capable wallets.
    let key_image = ctx.keys.legacy.spend_secret.map(|spend| {
        let base = if major != 0 || minor != 0 {
            spend + subaddress::cn_subaddress_secret(&ctx.keys.legacy.view_secret, major, minor)
        } else {
            spend
        };
        derive::generate_key_image(&output_key, &(base + h))
    });

    Some(WalletOutput {
        key_image,
        public_key: output_key,
        tx_hash: meta.tx_hash,
        output_index: index,
        global_index,
        block_height: meta.block_height,
        unlock_time,
        amount,
        asset_type: asset_type.to_string(),
        mask,
        commitment,
        subaddress_major: major,
        subaddress_minor: minor,
        is_carrot: false,
        carrot_enote_type: None,
        carrot_shared_secret: None,
        is_spent: false,
        spent_height: None,
        spent_tx: None,
        is_frozen: false,
    })
}

/// Key images spent by `tx` (the store decides which are ours).
pub fn spent_key_images(tx: &Transaction) -> Vec<[u8; 32]> {
    tx.prefix.vin.iter().filter_map(|i| i.key_image().copied()).collect()
}

/// True for transaction types whose outputs use the coinbase scan path.
pub fn is_coinbase_type(ty: u8) -> bool {
    ty == tx_type::MINER || ty == tx_type::PROTOCOL
}

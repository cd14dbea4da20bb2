//! Spend preparation: turn stored outputs into ring-resolved builder
//! inputs.
//!
//! Selects unlocked outputs covering the requested total, draws decoys
//! from the chain's output distribution, resolves ring members, and
//! derives the per-output spend secrets (legacy one-time key or CARROT
//! twin keys).

use sal_crypto::carrot_scan;
use sal_crypto::derive;
use sal_crypto::subaddress;
use sal_tx::builder::{InputSecret, SpendInput};
use sal_tx::decoy::{DecoySelector, RING_SIZE};
use sal_tx::extra::{find_additional_pubkeys, find_tx_pubkey, parse_extra};
use sal_types::consensus::is_unlocked;

use crate::chain::ChainSource;
use crate::error::WalletError;
use crate::keys::WalletKeys;
use crate::store::{OutputFilter, WalletOutput, WalletStore};

/// Pick unspent, unlocked outputs of `asset_type` covering `total`
/// (largest first to keep input counts small).
pub fn select_outputs(
    store: &dyn WalletStore,
    asset_type: &str,
    total: u64,
    current_height: u64,
) -> Result<Vec<WalletOutput>, WalletError> {
    let filter = OutputFilter {
        asset_type: Some(asset_type.to_string()),
        account_index: None,
        unspent_only: true,
    };
    let mut candidates: Vec<WalletOutput> = store
        .get_outputs(&filter)
        .map_err(WalletError::Store)?
        .into_iter()
        .filter(|o| {
            !o.is_frozen
                && o.key_image.is_some()
                && is_unlocked(o.unlock_time, o.block_height, current_height)
        })
        .collect();
    candidates.sort_by(|a, b| b.amount.cmp(&a.amount));

    let mut picked = Vec::new();
    let mut sum = 0u64;
    for output in candidates {
        sum = sum.saturating_add(output.amount);
        picked.push(output);
        if sum >= total {
            return Ok(picked);
        }
    }
    Err(WalletError::KeyDerivation(format!(
        "insufficient unlocked funds: have {sum}, need {total}"
    )))
}

/// Derive the spend secret(s) for one owned output.
fn derive_input_secret(
    keys: &WalletKeys,
    output: &WalletOutput,
    tx_extra: Option<&[u8]>,
) -> Result<InputSecret, WalletError> {
    if output.is_carrot {
        let shared = output.carrot_shared_secret.ok_or_else(|| {
            WalletError::KeyDerivation("carrot output without stored shared secret".into())
        })?;
        let (x, y) = carrot_scan::derive_spend_keys(&keys.carrot, &shared, &output.commitment)
            .ok_or_else(|| {
                WalletError::KeyDerivation("view-only wallet cannot derive spend keys".into())
            })?;
        return Ok(InputSecret::Carrot { x, y });
    }

    // Legacy: re-derive the one-time secret from the tx pubkey.
    let spend = keys.legacy.spend_secret.ok_or_else(|| {
        WalletError::KeyDerivation("view-only wallet cannot derive spend keys".into())
    })?;
    let extra_bytes = tx_extra.ok_or_else(|| {
        WalletError::KeyDerivation("legacy output needs the source tx extra".into())
    })?;
    let entries = parse_extra(extra_bytes);
    let tx_pubkey = find_additional_pubkeys(&entries)
        .and_then(|keys| keys.get(output.output_index as usize).copied())
        .or_else(|| find_tx_pubkey(&entries))
        .ok_or_else(|| WalletError::KeyDerivation("source tx carries no pubkey".into()))?;

    let derivation = derive::key_derivation(&tx_pubkey, &keys.legacy.view_secret)?;
    let h = derive::derivation_to_scalar(&derivation, output.output_index);
    let base = if output.subaddress_major != 0 || output.subaddress_minor != 0 {
        spend
            + subaddress::cn_subaddress_secret(
                &keys.legacy.view_secret,
                output.subaddress_major,
                output.subaddress_minor,
            )
    } else {
        spend
    };
    Ok(InputSecret::Legacy { x: base + h })
}

/// Resolve a ring for each selected output and attach its secrets.
///
/// `tx_extras` supplies the source-tx extra field per output (legacy
/// outputs only; CARROT spend keys come from the stored shared secret).
pub fn prepare_inputs(
    chain: &dyn ChainSource,
    keys: &WalletKeys,
    outputs: &[WalletOutput],
    tx_extras: &[Option<Vec<u8>>],
) -> Result<Vec<SpendInput>, WalletError> {
    let distribution = chain.get_output_distribution().map_err(WalletError::Chain)?;
    let selector = DecoySelector::new(distribution)?;

    let mut inputs = Vec::with_capacity(outputs.len());
    for (i, output) in outputs.iter().enumerate() {
        let (ring_indices, real_position) = selector.build_ring(output.global_index, RING_SIZE)?;

        let members = chain.get_outputs(&ring_indices).map_err(WalletError::Chain)?;
        if members.len() != ring_indices.len() {
            return Err(WalletError::ChainInconsistency {
                height: output.block_height,
                what: "daemon returned fewer ring members than requested".into(),
            });
        }
        let mut ring_keys = Vec::with_capacity(members.len());
        let mut ring_commitments = Vec::with_capacity(members.len());
        for member in &members {
            ring_keys.push(member.key);
            ring_commitments.push(member.commitment);
        }
        // The daemon's view of the real member must agree with ours.
        if ring_keys[real_position] != output.public_key {
            return Err(WalletError::ChainInconsistency {
                height: output.block_height,
                what: "real output mismatch at ring position".into(),
            });
        }

        let secret = derive_input_secret(keys, output, tx_extras.get(i).and_then(|e| e.as_deref()))?;
        inputs.push(SpendInput {
            amount: output.amount,
            asset_type: output.asset_type.clone(),
            key_image: output.key_image.expect("selection keeps only spendable outputs"),
            mask: output.mask,
            secret,
            ring_indices,
            real_position,
            ring_keys,
            ring_commitments,
        });
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use curve25519_dalek::scalar::Scalar;
    use sal_crypto::curve::compress;
    use sal_crypto::pedersen;
    use sal_types::Network;

    fn owned(amount: u64, height: u64, tag: u8) -> WalletOutput {
        let mask = Scalar::from(tag as u64 + 1);
        WalletOutput {
            key_image: Some([tag; 32]),
            public_key: [tag; 32],
            tx_hash: [0; 32],
            output_index: 0,
            global_index: tag as u64 * 100,
            block_height: height,
            unlock_time: 0,
            amount,
            asset_type: "SAL1".into(),
            mask,
            commitment: compress(&pedersen::commit(amount, &mask)),
            subaddress_major: 0,
            subaddress_minor: 0,
            is_carrot: true,
            carrot_enote_type: Some(0),
            carrot_shared_secret: Some([tag; 32]),
            is_spent: false,
            spent_height: None,
            spent_tx: None,
            is_frozen: false,
        }
    }

    #[test]
    fn selection_prefers_large_outputs_and_respects_locks() {
        let mut store = MemoryStore::default();
        store.put_output(owned(1_000, 10, 1)).unwrap();
        store.put_output(owned(5_000, 10, 2)).unwrap();
        store.put_output(owned(9_000, 998, 3)).unwrap(); // still locked at 1000

        let picked = select_outputs(&store, "SAL1", 4_000, 1_000).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].amount, 5_000);

        assert!(select_outputs(&store, "SAL1", 10_000, 1_000).is_err());
    }

    #[test]
    fn carrot_secret_derivation_requires_shared_secret() {
        let keys = WalletKeys::from_seed(&[1; 32], Network::Testnet);
        let mut out = owned(10, 1, 4);
        out.carrot_shared_secret = None;
        assert!(derive_input_secret(&keys, &out, None).is_err());
    }
}

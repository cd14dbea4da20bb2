//! Build a transaction against a synthetic chain, serialize it, parse it
//! back, and verify everything that a relay would.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::scalar::Scalar;

use sal_crypto::carrot::CarrotKeys;
use sal_crypto::curve::{compress, msm, mul_base, random_scalar, t_point};
use sal_crypto::derive::generate_key_image;
use sal_crypto::pedersen;
use sal_types::consensus::FeePriority;
use sal_types::AssetType;
use sal_tx::builder::{build_transaction, BuildOptions, Destination, InputSecret, SpendInput};
use sal_tx::verify::{verify_rct, RingMembers};
use sal_tx::{parse_transaction, serialize_transaction, tx_hash};

/// A fake on-chain output the wallet owns, inside a decoy ring.
struct OwnedOutput {
    amount: u64,
    mask: Scalar,
    secret: InputSecret,
    onetime_address: [u8; 32],
    commitment: [u8; 32],
    key_image: [u8; 32],
}

fn make_legacy_output(amount: u64) -> OwnedOutput {
    let x = random_scalar();
    let mask = random_scalar();
    let onetime_address = compress(&mul_base(&x));
    OwnedOutput {
        amount,
        mask,
        secret: InputSecret::Legacy { x },
        onetime_address,
        commitment: compress(&pedersen::commit(amount, &mask)),
        key_image: generate_key_image(&onetime_address, &x),
    }
}

fn make_carrot_output(amount: u64) -> OwnedOutput {
    let x = random_scalar();
    let y = random_scalar();
    let mask = random_scalar();
    let onetime_address = compress(&msm(&[x, y], &[ED25519_BASEPOINT_POINT, *t_point()]));
    OwnedOutput {
        amount,
        mask,
        secret: InputSecret::Carrot { x, y },
        onetime_address,
        commitment: compress(&pedersen::commit(amount, &mask)),
        key_image: generate_key_image(&onetime_address, &x),
    }
}

/// Surround the real output with random decoys at `position`.
fn ring_for(output: &OwnedOutput, ring_size: usize, position: usize) -> SpendInput {
    let mut keys = Vec::with_capacity(ring_size);
    let mut commitments = Vec::with_capacity(ring_size);
    for i in 0..ring_size {
        if i == position {
            keys.push(output.onetime_address);
            commitments.push(output.commitment);
        } else {
            keys.push(compress(&mul_base(&random_scalar())));
            commitments.push(compress(&mul_base(&random_scalar())));
        }
    }
    SpendInput {
        amount: output.amount,
        asset_type: "SAL1".into(),
        key_image: output.key_image,
        mask: output.mask,
        secret: output.secret.clone(),
        ring_indices: (100..100 + ring_size as u64).collect(),
        real_position: position,
        ring_keys: keys,
        ring_commitments: commitments,
    }
}

fn rings_from_tx(tx: &sal_tx::Transaction, inputs: &[SpendInput]) -> Vec<RingMembers> {
    // The builder sorts inputs by key image (descending); match them up.
    tx.prefix
        .vin
        .iter()
        .map(|vin| {
            let ki = vin.key_image().unwrap();
            let input = inputs.iter().find(|i| &i.key_image == ki).unwrap();
            RingMembers {
                keys: input.ring_keys.clone(),
                commitments: input.ring_commitments.clone(),
            }
        })
        .collect()
}

#[test]
fn legacy_transfer_builds_and_verifies() {
    let sender = CarrotKeys::from_master(&[0x31; 32]);
    let recipient = CarrotKeys::from_master(&[0x32; 32]);

    let outputs = vec![make_legacy_output(2_000_000), make_legacy_output(3_000_000)];
    let inputs: Vec<SpendInput> =
        outputs.iter().enumerate().map(|(i, o)| ring_for(o, 16, i + 3)).collect();

    let dest = Destination {
        spend_pubkey: recipient.account_spend_pubkey,
        view_pubkey: recipient.primary_address_view_pubkey,
        amount: 1_500_000,
        is_subaddress: false,
    };
    let mut opts = BuildOptions::transfer(AssetType::Sal1, sender.account_spend_pubkey);
    opts.priority = FeePriority::Low;

    let built = build_transaction(inputs.clone(), &[dest], &sender, &opts).unwrap();
    assert_eq!(built.tx.prefix.vout.len(), 2);
    assert!(built.fee > 0);

    // Wire round trip.
    let bytes = serialize_transaction(&built.tx);
    let parsed = parse_transaction(&bytes).unwrap();
    assert_eq!(serialize_transaction(&parsed), bytes);
    assert_eq!(tx_hash(&parsed), built.tx_hash);

    // Full verification on the parsed copy.
    verify_rct(&parsed, &rings_from_tx(&parsed, &inputs)).unwrap();
}

#[test]
fn carrot_transfer_uses_tclsag_and_verifies() {
    let sender = CarrotKeys::from_master(&[0x33; 32]);
    let recipient = CarrotKeys::from_master(&[0x34; 32]);

    let output = make_carrot_output(10_000_000);
    let inputs = vec![ring_for(&output, 16, 7)];

    let dest = Destination {
        spend_pubkey: recipient.account_spend_pubkey,
        view_pubkey: recipient.primary_address_view_pubkey,
        amount: 4_000_000,
        is_subaddress: false,
    };
    let opts = BuildOptions::transfer(AssetType::Sal1, sender.account_spend_pubkey);

    let built = build_transaction(inputs.clone(), &[dest], &sender, &opts).unwrap();
    let rct = built.tx.rct.as_ref().unwrap();
    assert_eq!(rct.rct_type, sal_types::rct_type::SALVIUM_ONE);
    let prunable = rct.prunable.as_ref().unwrap();
    assert_eq!(prunable.tclsags.len(), 1);
    assert!(prunable.clsags.is_empty());

    let bytes = serialize_transaction(&built.tx);
    let parsed = parse_transaction(&bytes).unwrap();
    assert_eq!(serialize_transaction(&parsed), bytes);
    verify_rct(&parsed, &rings_from_tx(&parsed, &inputs)).unwrap();
}

#[test]
fn recipient_scans_built_transaction() {
    let sender = CarrotKeys::from_master(&[0x35; 32]);
    let recipient = CarrotKeys::from_master(&[0x36; 32]);

    let output = make_carrot_output(8_000_000);
    let inputs = vec![ring_for(&output, 16, 0)];
    let dest = Destination {
        spend_pubkey: recipient.account_spend_pubkey,
        view_pubkey: recipient.primary_address_view_pubkey,
        amount: 2_500_000,
        is_subaddress: false,
    };
    let opts = BuildOptions::transfer(AssetType::Sal1, sender.account_spend_pubkey);
    let built = build_transaction(inputs, &[dest], &sender, &opts).unwrap();

    // Reconstruct what a scanner sees from the serialized tx.
    let parsed = parse_transaction(&serialize_transaction(&built.tx)).unwrap();
    let entries = sal_tx::extra::parse_extra(&parsed.prefix.extra);
    let ephemerals: Vec<[u8; 32]> = match sal_tx::extra::find_additional_pubkeys(&entries) {
        Some(keys) => keys.to_vec(),
        None => vec![sal_tx::extra::find_tx_pubkey(&entries).unwrap()],
    };
    let first_ki = parsed.prefix.first_key_image().unwrap();
    let ctx = sal_tx::carrot::make_input_context_rct(first_ki);
    let rct = parsed.rct.as_ref().unwrap();

    let mut found_payment = false;
    for (i, out) in parsed.prefix.vout.iter().enumerate() {
        let sal_tx::TxOutTarget::CarrotV1 { key, view_tag, encrypted_janus_anchor, .. } =
            &out.target
        else {
            panic!("expected carrot outputs");
        };
        let eph = if ephemerals.len() == 1 { ephemerals[0] } else { ephemerals[i] };
        let scan = sal_crypto::carrot_scan::EnoteScanInput {
            onetime_address: *key,
            view_tag: *view_tag,
            ephemeral_pubkey: eph,
            encrypted_amount: rct.ecdh_amounts[i],
            commitment: Some(rct.out_pk[i]),
            encrypted_anchor: Some(*encrypted_janus_anchor),
            clear_amount: None,
            payment_id: [0u8; 8],
        };
        if let Some(res) = sal_crypto::carrot_scan::scan_external(&recipient, &scan, &ctx, &[]) {
            assert_eq!(res.amount, 2_500_000);
            assert_eq!(
                compress(&pedersen::commit(res.amount, &res.mask)),
                rct.out_pk[i]
            );
            found_payment = true;
        }
    }
    assert!(found_payment, "recipient must find the payment output");
}

#[test]
fn conversion_burn_balances() {
    let sender = CarrotKeys::from_master(&[0x37; 32]);
    let recipient = CarrotKeys::from_master(&[0x38; 32]);

    let output = make_carrot_output(50_000_000);
    let inputs = vec![ring_for(&output, 16, 2)];
    let dest = Destination {
        spend_pubkey: recipient.account_spend_pubkey,
        view_pubkey: recipient.primary_address_view_pubkey,
        amount: 1_000_000,
        is_subaddress: false,
    };
    let mut opts = BuildOptions::transfer(AssetType::Sal1, sender.account_spend_pubkey);
    opts.tx_type = sal_types::tx_type::CONVERT;
    opts.destination_asset = AssetType::Vsd;
    opts.amount_burnt = 3_200_000;
    opts.amount_slippage_limit = 100_000;

    let built = build_transaction(inputs.clone(), &[dest], &sender, &opts).unwrap();
    assert_eq!(built.tx.prefix.amount_burnt, 3_200_000);

    // The burnt amount participates in the balance equation, so full
    // verification exercises it.
    verify_rct(&built.tx, &rings_from_tx(&built.tx, &inputs)).unwrap();
}

#[test]
fn tampered_fee_breaks_verification() {
    let sender = CarrotKeys::from_master(&[0x39; 32]);
    let recipient = CarrotKeys::from_master(&[0x3a; 32]);
    let output = make_legacy_output(5_000_000);
    let inputs = vec![ring_for(&output, 11, 4)];
    let dest = Destination {
        spend_pubkey: recipient.account_spend_pubkey,
        view_pubkey: recipient.primary_address_view_pubkey,
        amount: 1_000_000,
        is_subaddress: false,
    };
    let opts = BuildOptions::transfer(AssetType::Sal1, sender.account_spend_pubkey);
    let built = build_transaction(inputs.clone(), &[dest], &sender, &opts).unwrap();

    let mut tampered = built.tx.clone();
    tampered.rct.as_mut().unwrap().txn_fee += 1;
    assert!(verify_rct(&tampered, &rings_from_tx(&tampered, &inputs)).is_err());
}

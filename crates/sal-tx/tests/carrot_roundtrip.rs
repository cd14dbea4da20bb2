//! End-to-end CARROT enote round trips: what the sender builds, the
//! receiver's scanner must recover exactly.

use sal_crypto::carrot::CarrotKeys;
use sal_crypto::carrot_scan::{self, EnoteScanInput};
use sal_crypto::curve::compress;
use sal_crypto::pedersen;
use sal_crypto::subaddress::carrot_subaddress_map;
use sal_tx::carrot::{
    build_change_enote, build_payment_enote, make_input_context_coinbase, make_input_context_rct,
    BuiltEnote, EnoteParams,
};

fn scan_input(enote: &BuiltEnote, coinbase: bool) -> EnoteScanInput {
    EnoteScanInput {
        onetime_address: enote.onetime_address,
        view_tag: enote.view_tag,
        ephemeral_pubkey: enote.ephemeral_pubkey,
        encrypted_amount: enote.encrypted_amount,
        commitment: (!coinbase).then_some(enote.amount_commitment),
        encrypted_anchor: Some(enote.encrypted_anchor),
        clear_amount: coinbase.then_some(enote.amount),
        payment_id: [0u8; 8],
    }
}

#[test]
fn payment_to_main_address_scans_back() {
    let keys = CarrotKeys::from_master(&[0x21; 32]);
    let ctx = make_input_context_rct(&[0x5a; 32]);

    let enote = build_payment_enote(&EnoteParams {
        recipient_spend_pubkey: &keys.account_spend_pubkey,
        recipient_view_pubkey: &keys.primary_address_view_pubkey,
        amount: 123_456_789,
        input_context: &ctx,
        payment_id: [0u8; 8],
        is_subaddress: false,
        is_coinbase: false,
    })
    .unwrap();

    let found = carrot_scan::scan_external(&keys, &scan_input(&enote, false), &ctx, &[])
        .expect("own payment must scan");
    assert_eq!(found.amount, 123_456_789);
    assert!(found.is_main_address);
    assert_eq!(found.enote_type, 0);
    assert_eq!(found.mask, enote.commitment_mask);
    // The recovered mask must re-open the on-chain commitment.
    assert_eq!(
        compress(&pedersen::commit(found.amount, &found.mask)),
        enote.amount_commitment
    );
}

#[test]
fn payment_to_subaddress_recovers_index() {
    let keys = CarrotKeys::from_master(&[0x22; 32]);
    let map = carrot_subaddress_map(&keys, 2, 4).unwrap();
    let (sub_spend, major, minor) = map
        .iter()
        .find(|(_, maj, min)| *maj == 1 && *min == 3)
        .copied()
        .unwrap();

    // Subaddress view pubkey: K^j_v = k_vi * K^j_s.
    let sub_view = compress(
        &(keys.view_incoming_key * sal_crypto::curve::decompress(&sub_spend).unwrap()),
    );

    let ctx = make_input_context_rct(&[0x01; 32]);
    let enote = build_payment_enote(&EnoteParams {
        recipient_spend_pubkey: &sub_spend,
        recipient_view_pubkey: &sub_view,
        amount: 42,
        input_context: &ctx,
        payment_id: [0u8; 8],
        is_subaddress: true,
        is_coinbase: false,
    })
    .unwrap();

    let found = carrot_scan::scan_external(&keys, &scan_input(&enote, false), &ctx, &map)
        .expect("subaddress payment must scan");
    assert_eq!(found.amount, 42);
    assert!(!found.is_main_address);
    assert_eq!((found.subaddress_major, found.subaddress_minor), (major, minor));
}

#[test]
fn change_enote_scans_with_special_anchor() {
    let keys = CarrotKeys::from_master(&[0x23; 32]);
    let ctx = make_input_context_rct(&[0x77; 32]);

    let enote = build_change_enote(
        &EnoteParams {
            recipient_spend_pubkey: &keys.account_spend_pubkey,
            recipient_view_pubkey: &keys.primary_address_view_pubkey,
            amount: 5_000,
            input_context: &ctx,
            payment_id: [0u8; 8],
            is_subaddress: false,
            is_coinbase: false,
        },
        &keys.view_incoming_key,
    )
    .unwrap();

    let found = carrot_scan::scan_external(&keys, &scan_input(&enote, false), &ctx, &[])
        .expect("change must pass the special-anchor janus path");
    assert_eq!(found.amount, 5_000);
    assert_eq!(found.enote_type, 1);
}

#[test]
fn coinbase_enote_scans_with_identity_mask() {
    let keys = CarrotKeys::from_master(&[0x24; 32]);
    let ctx = make_input_context_coinbase(1_000);

    let enote = build_payment_enote(&EnoteParams {
        recipient_spend_pubkey: &keys.account_spend_pubkey,
        recipient_view_pubkey: &keys.primary_address_view_pubkey,
        amount: 600_000_000,
        input_context: &ctx,
        payment_id: [0u8; 8],
        is_subaddress: false,
        is_coinbase: true,
    })
    .unwrap();

    let found = carrot_scan::scan_external(&keys, &scan_input(&enote, true), &ctx, &[])
        .expect("coinbase must scan");
    assert_eq!(found.amount, 600_000_000);
    assert_eq!(found.mask, curve25519_dalek::scalar::Scalar::ONE);
}

#[test]
fn other_wallet_cannot_scan() {
    let keys = CarrotKeys::from_master(&[0x25; 32]);
    let stranger = CarrotKeys::from_master(&[0x26; 32]);
    let ctx = make_input_context_rct(&[0x02; 32]);

    let enote = build_payment_enote(&EnoteParams {
        recipient_spend_pubkey: &keys.account_spend_pubkey,
        recipient_view_pubkey: &keys.primary_address_view_pubkey,
        amount: 1,
        input_context: &ctx,
        payment_id: [0u8; 8],
        is_subaddress: false,
        is_coinbase: false,
    })
    .unwrap();

    assert!(carrot_scan::scan_external(&stranger, &scan_input(&enote, false), &ctx, &[]).is_none());
}

#[test]
fn derived_spend_keys_open_the_onetime_address() {
    let keys = CarrotKeys::from_master(&[0x27; 32]);
    let ctx = make_input_context_rct(&[0x03; 32]);
    let enote = build_payment_enote(&EnoteParams {
        recipient_spend_pubkey: &keys.account_spend_pubkey,
        recipient_view_pubkey: &keys.primary_address_view_pubkey,
        amount: 9_999,
        input_context: &ctx,
        payment_id: [0u8; 8],
        is_subaddress: false,
        is_coinbase: false,
    })
    .unwrap();

    let found = carrot_scan::scan_external(&keys, &scan_input(&enote, false), &ctx, &[]).unwrap();

    // Spend keys derived from the scan must reproduce the one-time
    // address over (G, T).
    let (x, y) =
        carrot_scan::derive_spend_keys(&keys, &found.sender_receiver_secret, &enote.amount_commitment)
            .unwrap();
    let reconstructed = sal_crypto::curve::msm(
        &[x, y],
        &[
            curve25519_dalek::constants::ED25519_BASEPOINT_POINT,
            *sal_crypto::curve::t_point(),
        ],
    );
    assert_eq!(compress(&reconstructed), enote.onetime_address);
}

#[test]
fn janus_tampered_ephemeral_rejected() {
    // Swap the ephemeral pubkey for a different one: the view tag or the
    // janus check must kill the output.
    let keys = CarrotKeys::from_master(&[0x28; 32]);
    let ctx = make_input_context_rct(&[0x04; 32]);
    let enote = build_payment_enote(&EnoteParams {
        recipient_spend_pubkey: &keys.account_spend_pubkey,
        recipient_view_pubkey: &keys.primary_address_view_pubkey,
        amount: 7,
        input_context: &ctx,
        payment_id: [0u8; 8],
        is_subaddress: false,
        is_coinbase: false,
    })
    .unwrap();

    let mut tampered = scan_input(&enote, false);
    tampered.ephemeral_pubkey = [9u8; 32];
    assert!(carrot_scan::scan_external(&keys, &tampered, &ctx, &[]).is_none());
}

//! Transaction hashing.
//!
//! A v2+ transaction hash is Keccak over three component hashes:
//! prefix, RCT base, RCT prunable (zero hash when the prunable half is
//! absent or the signature is null). The ring-signature message is the
//! related but distinct pre-signature hash, committing to the prefix,
//! the serialized base, and the raw Bulletproofs+ elements.

use sal_crypto::bulletproofs_plus::BppProof;
use sal_crypto::curve::compress;
use sal_crypto::hash::{keccak256, keccak256_multi};

use crate::codec::{serialize_rct_base, serialize_tx_prefix, serialize_transaction};
use crate::types::{RctPrunable, Transaction};

/// Keccak of the serialized prefix.
pub fn tx_prefix_hash(tx: &Transaction) -> [u8; 32] {
    keccak256(&serialize_tx_prefix(&tx.prefix))
}

/// Full transaction hash.
///
/// v1: hash of the whole blob. v2+: hash of the three component hashes.
pub fn tx_hash(tx: &Transaction) -> [u8; 32] {
    let Some(rct) = &tx.rct else {
        return keccak256(&serialize_transaction(tx));
    };

    let prefix_hash = tx_prefix_hash(tx);
    let base_hash = keccak256(&serialize_rct_base(rct));
    let prunable_hash = match &rct.prunable {
        Some(p) if !rct.is_null() => {
            let mut buf = Vec::new();
            crate::codec::put_prunable(&mut buf, p);
            keccak256(&buf)
        }
        _ => [0u8; 32],
    };

    keccak256_multi(&[&prefix_hash, &base_hash, &prunable_hash])
}

/// Flat key-vector of BP+ elements the signature message commits to:
/// per proof `A, A1, B, r1, s1, d1, L..., R...`, 32 bytes each, no
/// length framing.
pub fn bpp_transcript_bytes(proofs: &[BppProof]) -> Vec<u8> {
    let mut out = Vec::new();
    for p in proofs {
        out.extend_from_slice(&compress(&p.a));
        out.extend_from_slice(&compress(&p.a1));
        out.extend_from_slice(&compress(&p.b));
        out.extend_from_slice(&p.r1.to_bytes());
        out.extend_from_slice(&p.s1.to_bytes());
        out.extend_from_slice(&p.d1.to_bytes());
        for l in &p.l {
            out.extend_from_slice(&compress(l));
        }
        for r in &p.r {
            out.extend_from_slice(&compress(r));
        }
    }
    out
}

/// Message every CLSAG/TCLSAG in the transaction signs:
/// `H(prefix_hash || H(rct_base) || H(bpp_elements))`.
pub fn signature_message(tx: &Transaction) -> Option<[u8; 32]> {
    let rct = tx.rct.as_ref()?;
    if rct.is_null() {
        return None;
    }
    let prefix_hash = tx_prefix_hash(tx);
    let base_hash = keccak256(&serialize_rct_base(rct));
    let bpp = rct
        .prunable
        .as_ref()
        .map(|p| bpp_transcript_bytes(&p.bulletproofs_plus))
        .unwrap_or_default();
    let bpp_hash = keccak256(&bpp);
    Some(keccak256_multi(&[&prefix_hash, &base_hash, &bpp_hash]))
}

/// Same message computed from parts, for the builder before the final
/// struct exists.
pub fn signature_message_parts(
    prefix_hash: &[u8; 32],
    rct_base: &[u8],
    bpp_elements: &[u8],
) -> [u8; 32] {
    keccak256_multi(&[prefix_hash, &keccak256(rct_base), &keccak256(bpp_elements)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use sal_types::{rct_type, tx_type};

    fn sample_tx() -> Transaction {
        Transaction {
            prefix: TxPrefix {
                version: 2,
                vin: vec![TxInput::ToKey {
                    amount: 0,
                    asset_type: "SAL1".into(),
                    key_offsets: vec![10, 1],
                    key_image: [1u8; 32],
                }],
                vout: vec![],
                tx_type: tx_type::TRANSFER,
                source_asset_type: "SAL1".into(),
                destination_asset_type: "SAL1".into(),
                ..TxPrefix::default()
            },
            rct: Some(RctSignature {
                rct_type: rct_type::BULLETPROOF_PLUS,
                txn_fee: 1000,
                p_r: [0u8; 32],
                prunable: Some(RctPrunable::default()),
                ..RctSignature::default()
            }),
        }
    }

    #[test]
    fn hash_is_deterministic_and_binds_prefix() {
        let tx = sample_tx();
        let h1 = tx_hash(&tx);
        assert_eq!(h1, tx_hash(&tx));

        let mut tx2 = tx.clone();
        tx2.prefix.unlock_time = 99;
        assert_ne!(h1, tx_hash(&tx2));
    }

    #[test]
    fn message_binds_fee() {
        let tx = sample_tx();
        let m1 = signature_message(&tx).unwrap();
        let mut tx2 = tx.clone();
        tx2.rct.as_mut().unwrap().txn_fee = 2000;
        assert_ne!(m1, signature_message(&tx2).unwrap());
    }

    #[test]
    fn null_rct_has_no_message() {
        let mut tx = sample_tx();
        tx.rct.as_mut().unwrap().rct_type = rct_type::NULL;
        assert!(signature_message(&tx).is_none());
    }

    #[test]
    fn parts_match_whole() {
        let tx = sample_tx();
        let rct = tx.rct.as_ref().unwrap();
        let whole = signature_message(&tx).unwrap();
        let parts = signature_message_parts(
            &tx_prefix_hash(&tx),
            &crate::codec::serialize_rct_base(rct),
            &bpp_transcript_bytes(&[]),
        );
        assert_eq!(whole, parts);
    }
}

//! tx_extra TLV parsing and construction.
//!
//! Tags: 0x00 padding, 0x01 tx pubkey (bare 32 bytes), 0x02 nonce
//! (1-byte length; payment ids inside), 0x03 merge mining (varint
//! length), 0x04 additional pubkeys (1-byte count), 0xDE minergate,
//! anything else varint-length + payload. Parsing is lenient the way
//! relays are: it stops at the first malformed entry and keeps what it
//! has.

use crate::codec::put_varint;
use crate::error::TxError;

pub const TAG_PADDING: u8 = 0x00;
pub const TAG_PUBKEY: u8 = 0x01;
pub const TAG_NONCE: u8 = 0x02;
pub const TAG_MERGE_MINING: u8 = 0x03;
pub const TAG_ADDITIONAL_PUBKEYS: u8 = 0x04;
pub const TAG_MINERGATE: u8 = 0xDE;

/// Nonce interior tags.
const NONCE_PAYMENT_ID: u8 = 0x00;
const NONCE_ENCRYPTED_PAYMENT_ID: u8 = 0x01;

#[derive(Debug, Clone, PartialEq)]
pub enum ExtraEntry {
    /// Run of zero bytes.
    Padding(usize),
    /// Shared transaction pubkey (or shared CARROT ephemeral).
    TxPubkey([u8; 32]),
    /// Raw nonce payload (see `payment_id` helpers).
    Nonce(Vec<u8>),
    MergeMining(Vec<u8>),
    /// Per-output pubkeys / CARROT ephemerals.
    AdditionalPubkeys(Vec<[u8; 32]>),
    Minergate(Vec<u8>),
    Unknown { tag: u8, data: Vec<u8> },
}

/// Parse raw extra bytes. Never fails: unparseable tails are dropped,
/// matching how peers treat the field.
pub fn parse_extra(extra: &[u8]) -> Vec<ExtraEntry> {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    while pos < extra.len() {
        let tag = extra[pos];
        pos += 1;
        match tag {
            TAG_PADDING => {
                let start = pos;
                while pos < extra.len() && extra[pos] == 0 {
                    pos += 1;
                }
                entries.push(ExtraEntry::Padding(1 + pos - start));
            }
            TAG_PUBKEY => {
                if pos + 32 > extra.len() {
                    break;
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&extra[pos..pos + 32]);
                pos += 32;
                entries.push(ExtraEntry::TxPubkey(key));
            }
            TAG_NONCE => {
                if pos >= extra.len() {
                    break;
                }
                let len = extra[pos] as usize;
                pos += 1;
                if pos + len > extra.len() {
                    break;
                }
                entries.push(ExtraEntry::Nonce(extra[pos..pos + len].to_vec()));
                pos += len;
            }
            TAG_ADDITIONAL_PUBKEYS => {
                if pos >= extra.len() {
                    break;
                }
                let count = extra[pos] as usize;
                pos += 1;
                if pos + count * 32 > extra.len() {
                    break;
                }
                let mut keys = Vec::with_capacity(count);
                for _ in 0..count {
                    let mut key = [0u8; 32];
                    key.copy_from_slice(&extra[pos..pos + 32]);
                    keys.push(key);
                    pos += 32;
                }
                entries.push(ExtraEntry::AdditionalPubkeys(keys));
            }
            _ => {
                // varint length + payload.
                let Some((len, used)) = read_varint(&extra[pos..]) else { break };
                pos += used;
                let len = len as usize;
                if pos + len > extra.len() {
                    break;
                }
                let data = extra[pos..pos + len].to_vec();
                pos += len;
                entries.push(match tag {
                    TAG_MERGE_MINING => ExtraEntry::MergeMining(data),
                    TAG_MINERGATE => ExtraEntry::Minergate(data),
                    _ => ExtraEntry::Unknown { tag, data },
                });
            }
        }
    }

    entries
}

fn read_varint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &b) in data.iter().enumerate() {
        value |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            return Some((value, i + 1));
        }
        shift += 7;
        if shift >= 64 {
            return None;
        }
    }
    None
}

/// Serialize entries back into the flat field.
pub fn build_extra(entries: &[ExtraEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        match entry {
            ExtraEntry::Padding(len) => out.extend(std::iter::repeat(0u8).take(*len)),
            ExtraEntry::TxPubkey(key) => {
                out.push(TAG_PUBKEY);
                out.extend_from_slice(key);
            }
            ExtraEntry::Nonce(data) => {
                out.push(TAG_NONCE);
                out.push(data.len() as u8);
                out.extend_from_slice(data);
            }
            ExtraEntry::MergeMining(data) => {
                out.push(TAG_MERGE_MINING);
                put_varint(&mut out, data.len() as u64);
                out.extend_from_slice(data);
            }
            ExtraEntry::AdditionalPubkeys(keys) => {
                out.push(TAG_ADDITIONAL_PUBKEYS);
                out.push(keys.len() as u8);
                for k in keys {
                    out.extend_from_slice(k);
                }
            }
            ExtraEntry::Minergate(data) => {
                out.push(TAG_MINERGATE);
                put_varint(&mut out, data.len() as u64);
                out.extend_from_slice(data);
            }
            ExtraEntry::Unknown { tag, data } => {
                out.push(*tag);
                put_varint(&mut out, data.len() as u64);
                out.extend_from_slice(data);
            }
        }
    }
    out
}

/// Nonce payload for an 8-byte encrypted payment id.
pub fn encrypted_payment_id_nonce(pid: &[u8; 8]) -> ExtraEntry {
    let mut data = Vec::with_capacity(9);
    data.push(NONCE_ENCRYPTED_PAYMENT_ID);
    data.extend_from_slice(pid);
    ExtraEntry::Nonce(data)
}

/// Nonce payload for a 32-byte cleartext payment id.
pub fn payment_id_nonce(pid: &[u8; 32]) -> ExtraEntry {
    let mut data = Vec::with_capacity(33);
    data.push(NONCE_PAYMENT_ID);
    data.extend_from_slice(pid);
    ExtraEntry::Nonce(data)
}

/// First tx pubkey in the field, if any.
pub fn find_tx_pubkey(entries: &[ExtraEntry]) -> Option<[u8; 32]> {
    entries.iter().find_map(|e| match e {
        ExtraEntry::TxPubkey(k) => Some(*k),
        _ => None,
    })
}

pub fn find_additional_pubkeys(entries: &[ExtraEntry]) -> Option<&[[u8; 32]]> {
    entries.iter().find_map(|e| match e {
        ExtraEntry::AdditionalPubkeys(keys) => Some(keys.as_slice()),
        _ => None,
    })
}

/// Extract the encrypted payment id from a nonce entry.
pub fn find_encrypted_payment_id(entries: &[ExtraEntry]) -> Option<[u8; 8]> {
    entries.iter().find_map(|e| match e {
        ExtraEntry::Nonce(data) if data.len() == 9 && data[0] == NONCE_ENCRYPTED_PAYMENT_ID => {
            let mut pid = [0u8; 8];
            pid.copy_from_slice(&data[1..]);
            Some(pid)
        }
        _ => None,
    })
}

/// Store per-output CARROT ephemeral pubkeys with the consensus tag
/// choice: a single shared key (or two identical ones) uses tag 0x01;
/// everything else gets tag 0x04 only.
pub fn ephemeral_pubkey_entries(keys: &[[u8; 32]]) -> Result<Vec<ExtraEntry>, TxError> {
    if keys.is_empty() {
        return Err(TxError::Build("no ephemeral pubkeys to store".into()));
    }
    let shared = match keys.len() {
        1 => true,
        2 => keys[0] == keys[1],
        _ => false,
    };
    if shared {
        Ok(vec![ExtraEntry::TxPubkey(keys[0])])
    } else {
        Ok(vec![ExtraEntry::AdditionalPubkeys(keys.to_vec())])
    }
}

//! Typed transaction and block model.
//!
//! One struct per wire structure, field order identical to the binary
//! layout in `codec`. Hex/bytes conversion happens only at the codec
//! boundary; everything here holds decoded values.

use curve25519_dalek::scalar::Scalar;

use sal_crypto::bulletproofs_plus::BppProof;
use sal_types::{rct_type, tx_type};

/// Transaction input.
#[derive(Debug, Clone, PartialEq)]
pub enum TxInput {
    /// Coinbase (`txin_gen`).
    Gen { height: u64 },
    /// Ring spend (`txin_to_key`). `key_offsets` are stored
    /// first-absolute-then-delta.
    ToKey {
        amount: u64,
        asset_type: String,
        key_offsets: Vec<u64>,
        key_image: [u8; 32],
    },
}

impl TxInput {
    pub fn key_image(&self) -> Option<&[u8; 32]> {
        match self {
            TxInput::Gen { .. } => None,
            TxInput::ToKey { key_image, .. } => Some(key_image),
        }
    }

    pub fn ring_size(&self) -> usize {
        match self {
            TxInput::Gen { .. } => 0,
            TxInput::ToKey { key_offsets, .. } => key_offsets.len(),
        }
    }
}

/// Output destination variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutTarget {
    /// Plain one-time key.
    Key {
        key: [u8; 32],
        asset_type: String,
        unlock_time: u64,
    },
    /// One-time key + 1-byte view tag.
    TaggedKey {
        key: [u8; 32],
        asset_type: String,
        unlock_time: u64,
        view_tag: u8,
    },
    /// CARROT v1: 3-byte view tag + encrypted janus anchor.
    CarrotV1 {
        key: [u8; 32],
        asset_type: String,
        view_tag: [u8; 3],
        encrypted_janus_anchor: [u8; 16],
    },
}

impl TxOutTarget {
    pub fn key(&self) -> &[u8; 32] {
        match self {
            TxOutTarget::Key { key, .. }
            | TxOutTarget::TaggedKey { key, .. }
            | TxOutTarget::CarrotV1 { key, .. } => key,
        }
    }

    pub fn asset_type(&self) -> &str {
        match self {
            TxOutTarget::Key { asset_type, .. }
            | TxOutTarget::TaggedKey { asset_type, .. }
            | TxOutTarget::CarrotV1 { asset_type, .. } => asset_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TxOutput {
    /// Cleartext amount; 0 for RCT outputs.
    pub amount: u64,
    pub target: TxOutTarget,
}

/// Stake return data carried by v4+ STAKE transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolTxData {
    pub version: u64,
    pub return_address: [u8; 32],
    pub return_pubkey: [u8; 32],
    pub return_view_tag: [u8; 3],
    pub return_anchor_enc: [u8; 16],
}

/// Transaction prefix: everything under the prefix hash.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TxPrefix {
    pub version: u64,
    pub unlock_time: u64,
    pub vin: Vec<TxInput>,
    pub vout: Vec<TxOutput>,
    /// Raw extra bytes; interpret via `extra::parse_extra`.
    pub extra: Vec<u8>,
    pub tx_type: u8,
    pub amount_burnt: u64,
    /// Legacy (pre-v3 transfer) return fields.
    pub return_address: Option<[u8; 32]>,
    pub return_pubkey: Option<[u8; 32]>,
    /// v3+ TRANSFER: one return address per input plus a change mask.
    pub return_address_list: Vec<[u8; 32]>,
    pub return_address_change_mask: Vec<u8>,
    /// v4+ STAKE.
    pub protocol_tx_data: Option<ProtocolTxData>,
    pub source_asset_type: String,
    pub destination_asset_type: String,
    pub amount_slippage_limit: u64,
}

impl Default for TxInput {
    fn default() -> Self {
        TxInput::Gen { height: 0 }
    }
}

impl TxPrefix {
    /// Whether the Salvium suffix fields (burnt amount etc.) are present.
    pub fn has_salvium_fields(&self) -> bool {
        self.tx_type != tx_type::UNSET && self.tx_type != tx_type::PROTOCOL
    }

    /// First input's key image, the CARROT input-context seed.
    pub fn first_key_image(&self) -> Option<&[u8; 32]> {
        self.vin.first().and_then(|i| i.key_image())
    }
}

/// 96-byte Schnorr-style proof used in salvium_data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZkProof {
    pub r: [u8; 32],
    pub z1: [u8; 32],
    pub z2: [u8; 32],
}

/// Per-input audit record (salvium_data type 1).
#[derive(Debug, Clone, PartialEq)]
pub struct InputVerificationEntry {
    pub a_r: [u8; 32],
    pub amount: u64,
    pub index: u64,
    pub origin_tx_type: u8,
    pub a_r_stake: Option<[u8; 32]>,
    pub i_stake: Option<u64>,
}

/// Oracle-conversion proof block. `FullProofs` is the bare layout of RCT
/// type 7; `Versioned` is the tagged layout of types 8 and 9.
#[derive(Debug, Clone, PartialEq)]
pub enum SalviumData {
    FullProofs {
        pr_proof: ZkProof,
        sa_proof: ZkProof,
    },
    Versioned {
        data_type: u64,
        pr_proof: ZkProof,
        sa_proof: ZkProof,
        audit: Option<AuditData>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditData {
    pub cz_proof: ZkProof,
    pub input_verification_data: Vec<InputVerificationEntry>,
    pub spend_pubkey: [u8; 32],
    pub enc_view_privkey: Vec<u8>,
}

/// CLSAG as serialized inside a transaction (key image lives in the
/// input, not here).
#[derive(Debug, Clone, PartialEq)]
pub struct ClsagSig {
    pub s: Vec<Scalar>,
    pub c1: Scalar,
    pub d: [u8; 32],
}

#[derive(Debug, Clone, PartialEq)]
pub struct TclsagSig {
    pub sx: Vec<Scalar>,
    pub sy: Vec<Scalar>,
    pub c1: Scalar,
    pub d: [u8; 32],
}

/// Prunable half of the RCT signature.
#[derive(Debug, Clone, Default)]
pub struct RctPrunable {
    pub bulletproofs_plus: Vec<BppProof>,
    pub clsags: Vec<ClsagSig>,
    pub tclsags: Vec<TclsagSig>,
    pub pseudo_outs: Vec<[u8; 32]>,
}

/// RCT signature block.
#[derive(Debug, Clone, Default)]
pub struct RctSignature {
    pub rct_type: u8,
    pub txn_fee: u64,
    /// 8-byte encrypted amount per output.
    pub ecdh_amounts: Vec<[u8; 8]>,
    /// Output commitments, one per output.
    pub out_pk: Vec<[u8; 32]>,
    /// Salvium return-payment point.
    pub p_r: [u8; 32],
    pub salvium_data: Option<SalviumData>,
    /// `None` on pruned transactions.
    pub prunable: Option<RctPrunable>,
}

impl RctSignature {
    pub fn is_null(&self) -> bool {
        self.rct_type == rct_type::NULL
    }
}

/// Full transaction. `rct` is `None` only for v1 transactions.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub prefix: TxPrefix,
    pub rct: Option<RctSignature>,
}

/// Oracle pricing record embedded in block headers once the oracle fork
/// activates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PricingRecord {
    pub version: u64,
    pub height: u64,
    pub supply_sal: u64,
    pub supply_vsd: u64,
    pub assets: Vec<AssetPrice>,
    pub timestamp: u64,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetPrice {
    pub asset_type: String,
    pub spot_price: u64,
    pub ma_price: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockHeader {
    pub major_version: u64,
    pub minor_version: u64,
    pub timestamp: u64,
    pub prev_id: [u8; 32],
    pub nonce: u32,
    pub pricing_record: Option<PricingRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub miner_tx: Transaction,
    pub protocol_tx: Transaction,
    pub tx_hashes: Vec<[u8; 32]>,
}

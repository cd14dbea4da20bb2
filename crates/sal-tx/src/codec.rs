//! Binary (de)serialization for transactions and blocks.
//!
//! CryptoNote conventions throughout: varints are 7-bit LE with an MSB
//! continuation flag, strings are varint-length-prefixed UTF-8, structs
//! serialize field-by-field with no framing. `serialize(parse(bytes))`
//! reproduces `bytes` for every structurally valid blob.

use curve25519_dalek::scalar::Scalar;

use sal_crypto::bulletproofs_plus::BppProof;
use sal_crypto::curve::{compress, decompress_canonical, scalar_from_canonical};
use sal_types::{rct_type, tx_type, txin_tag, txout_tag};

use crate::error::TxError;
use crate::types::*;

/// Hard fork at which block headers start carrying a pricing record.
pub const HF_VERSION_ENABLE_ORACLE: u64 = 255;

/// Inner-product rounds accepted inside a serialized BP+ proof
/// (64-bit range, 1..=16 aggregated outputs).
const BPP_MIN_ROUNDS: usize = 6;
const BPP_MAX_ROUNDS: usize = 10;

// ─── Cursor ─────────────────────────────────────────────────────────────

pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pub pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], TxError> {
        if self.pos + n > self.data.len() {
            return Err(TxError::encoding(
                self.pos,
                format!("need {n} bytes, have {}", self.remaining()),
            ));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, TxError> {
        Ok(self.bytes(1)?[0])
    }

    fn arr<const N: usize>(&mut self) -> Result<[u8; N], TxError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn varint(&mut self) -> Result<u64, TxError> {
        let start = self.pos;
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let b = self.byte()?;
            if shift == 63 && b > 1 {
                return Err(TxError::encoding(start, "varint overflows 64 bits"));
            }
            value |= ((b & 0x7f) as u64) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(TxError::encoding(start, "varint too long"));
            }
        }
    }

    fn string(&mut self) -> Result<String, TxError> {
        let start = self.pos;
        let len = self.varint()? as usize;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| TxError::encoding(start, "string is not UTF-8"))
    }

    fn u32_le(&mut self) -> Result<u32, TxError> {
        Ok(u32::from_le_bytes(self.arr::<4>()?))
    }

    fn u64_le(&mut self) -> Result<u64, TxError> {
        Ok(u64::from_le_bytes(self.arr::<8>()?))
    }

    fn point(&mut self) -> Result<[u8; 32], TxError> {
        self.arr::<32>()
    }

    fn scalar(&mut self) -> Result<Scalar, TxError> {
        let start = self.pos;
        let bytes = self.arr::<32>()?;
        scalar_from_canonical(bytes)
            .map_err(|_| TxError::encoding(start, "non-canonical scalar"))
    }
}

// ─── Writer helpers ─────────────────────────────────────────────────────

pub(crate) fn put_varint(buf: &mut Vec<u8>, mut v: u64) {
    loop {
        let b = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(b);
            break;
        }
        buf.push(b | 0x80);
    }
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    put_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

// ─── Transaction prefix ─────────────────────────────────────────────────

fn parse_prefix(c: &mut Cursor) -> Result<TxPrefix, TxError> {
    let version = c.varint()?;
    let unlock_time = c.varint()?;

    let vin_count = c.varint()? as usize;
    let mut vin = Vec::with_capacity(vin_count.min(4096));
    for _ in 0..vin_count {
        let tag = c.byte()?;
        vin.push(match tag {
            txin_tag::GEN => TxInput::Gen { height: c.varint()? },
            txin_tag::KEY => {
                let amount = c.varint()?;
                let asset_type = c.string()?;
                let offset_count = c.varint()? as usize;
                let mut key_offsets = Vec::with_capacity(offset_count.min(4096));
                for _ in 0..offset_count {
                    key_offsets.push(c.varint()?);
                }
                TxInput::ToKey {
                    amount,
                    asset_type,
                    key_offsets,
                    key_image: c.point()?,
                }
            }
            other => {
                return Err(TxError::encoding(c.pos - 1, format!("unknown input tag {other:#x}")))
            }
        });
    }

    let vout_count = c.varint()? as usize;
    let mut vout = Vec::with_capacity(vout_count.min(4096));
    for _ in 0..vout_count {
        let amount = c.varint()?;
        let tag = c.byte()?;
        let target = match tag {
            txout_tag::KEY => TxOutTarget::Key {
                key: c.point()?,
                asset_type: c.string()?,
                unlock_time: c.varint()?,
            },
            txout_tag::TAGGED_KEY => TxOutTarget::TaggedKey {
                key: c.point()?,
                asset_type: c.string()?,
                unlock_time: c.varint()?,
                view_tag: c.byte()?,
            },
            txout_tag::CARROT_V1 => TxOutTarget::CarrotV1 {
                key: c.point()?,
                asset_type: c.string()?,
                view_tag: c.arr::<3>()?,
                encrypted_janus_anchor: c.arr::<16>()?,
            },
            other => {
                return Err(TxError::encoding(c.pos - 1, format!("unknown output tag {other:#x}")))
            }
        };
        vout.push(TxOutput { amount, target });
    }

    let extra_len = c.varint()? as usize;
    let extra = c.bytes(extra_len)?.to_vec();

    let tx_ty = c.varint()? as u8;

    let mut prefix = TxPrefix {
        version,
        unlock_time,
        vin,
        vout,
        extra,
        tx_type: tx_ty,
        ..TxPrefix::default()
    };

    if prefix.has_salvium_fields() {
        prefix.amount_burnt = c.varint()?;

        if tx_ty != tx_type::MINER {
            if tx_ty == tx_type::TRANSFER && version >= 3 {
                let count = c.varint()? as usize;
                for _ in 0..count {
                    prefix.return_address_list.push(c.point()?);
                }
                let mask_len = c.varint()? as usize;
                prefix.return_address_change_mask = c.bytes(mask_len)?.to_vec();
            } else if tx_ty == tx_type::STAKE && version >= 4 {
                prefix.protocol_tx_data = Some(ProtocolTxData {
                    version: c.varint()?,
                    return_address: c.point()?,
                    return_pubkey: c.point()?,
                    return_view_tag: c.arr::<3>()?,
                    return_anchor_enc: c.arr::<16>()?,
                });
            } else {
                prefix.return_address = Some(c.point()?);
                prefix.return_pubkey = Some(c.point()?);
            }

            prefix.source_asset_type = c.string()?;
            prefix.destination_asset_type = c.string()?;
            prefix.amount_slippage_limit = c.varint()?;
        }
    }

    Ok(prefix)
}

pub fn serialize_tx_prefix(prefix: &TxPrefix) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2048);
    put_varint(&mut buf, prefix.version);
    put_varint(&mut buf, prefix.unlock_time);

    put_varint(&mut buf, prefix.vin.len() as u64);
    for input in &prefix.vin {
        match input {
            TxInput::Gen { height } => {
                buf.push(txin_tag::GEN);
                put_varint(&mut buf, *height);
            }
            TxInput::ToKey { amount, asset_type, key_offsets, key_image } => {
                buf.push(txin_tag::KEY);
                put_varint(&mut buf, *amount);
                put_string(&mut buf, asset_type);
                put_varint(&mut buf, key_offsets.len() as u64);
                for o in key_offsets {
                    put_varint(&mut buf, *o);
                }
                buf.extend_from_slice(key_image);
            }
        }
    }

    put_varint(&mut buf, prefix.vout.len() as u64);
    for output in &prefix.vout {
        put_varint(&mut buf, output.amount);
        match &output.target {
            TxOutTarget::Key { key, asset_type, unlock_time } => {
                buf.push(txout_tag::KEY);
                buf.extend_from_slice(key);
                put_string(&mut buf, asset_type);
                put_varint(&mut buf, *unlock_time);
            }
            TxOutTarget::TaggedKey { key, asset_type, unlock_time, view_tag } => {
                buf.push(txout_tag::TAGGED_KEY);
                buf.extend_from_slice(key);
                put_string(&mut buf, asset_type);
                put_varint(&mut buf, *unlock_time);
                buf.push(*view_tag);
            }
            TxOutTarget::CarrotV1 { key, asset_type, view_tag, encrypted_janus_anchor } => {
                buf.push(txout_tag::CARROT_V1);
                buf.extend_from_slice(key);
                put_string(&mut buf, asset_type);
                buf.extend_from_slice(view_tag);
                buf.extend_from_slice(encrypted_janus_anchor);
            }
        }
    }

    put_varint(&mut buf, prefix.extra.len() as u64);
    buf.extend_from_slice(&prefix.extra);

    put_varint(&mut buf, prefix.tx_type as u64);

    if prefix.has_salvium_fields() {
        put_varint(&mut buf, prefix.amount_burnt);

        if prefix.tx_type != tx_type::MINER {
            if prefix.tx_type == tx_type::TRANSFER && prefix.version >= 3 {
                put_varint(&mut buf, prefix.return_address_list.len() as u64);
                for addr in &prefix.return_address_list {
                    buf.extend_from_slice(addr);
                }
                put_varint(&mut buf, prefix.return_address_change_mask.len() as u64);
                buf.extend_from_slice(&prefix.return_address_change_mask);
            } else if prefix.tx_type == tx_type::STAKE && prefix.version >= 4 {
                let ptx = prefix.protocol_tx_data.clone().unwrap_or(ProtocolTxData {
                    version: 1,
                    return_address: [0u8; 32],
                    return_pubkey: [0u8; 32],
                    return_view_tag: [0u8; 3],
                    return_anchor_enc: [0u8; 16],
                });
                put_varint(&mut buf, ptx.version);
                buf.extend_from_slice(&ptx.return_address);
                buf.extend_from_slice(&ptx.return_pubkey);
                buf.extend_from_slice(&ptx.return_view_tag);
                buf.extend_from_slice(&ptx.return_anchor_enc);
            } else {
                buf.extend_from_slice(&prefix.return_address.unwrap_or([0u8; 32]));
                buf.extend_from_slice(&prefix.return_pubkey.unwrap_or([0u8; 32]));
            }

            put_string(&mut buf, &prefix.source_asset_type);
            put_string(&mut buf, &prefix.destination_asset_type);
            put_varint(&mut buf, prefix.amount_slippage_limit);
        }
    }

    buf
}

// ─── RCT signature ──────────────────────────────────────────────────────

fn parse_zk_proof(c: &mut Cursor) -> Result<ZkProof, TxError> {
    Ok(ZkProof { r: c.point()?, z1: c.point()?, z2: c.point()? })
}

fn put_zk_proof(buf: &mut Vec<u8>, p: &ZkProof) {
    buf.extend_from_slice(&p.r);
    buf.extend_from_slice(&p.z1);
    buf.extend_from_slice(&p.z2);
}

fn parse_salvium_data(c: &mut Cursor, rct_ty: u8) -> Result<Option<SalviumData>, TxError> {
    match rct_ty {
        rct_type::FULL_PROOFS => Ok(Some(SalviumData::FullProofs {
            pr_proof: parse_zk_proof(c)?,
            sa_proof: parse_zk_proof(c)?,
        })),
        rct_type::SALVIUM_ZERO | rct_type::SALVIUM_ONE => {
            let data_type = c.varint()?;
            let pr_proof = parse_zk_proof(c)?;
            let sa_proof = parse_zk_proof(c)?;
            let audit = if data_type == 1 {
                let cz_proof = parse_zk_proof(c)?;
                let count = c.varint()? as usize;
                let mut entries = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    let a_r = c.point()?;
                    let amount = c.varint()?;
                    let index = c.varint()?;
                    let origin_tx_type = c.varint()? as u8;
                    let (a_r_stake, i_stake) = if origin_tx_type != 0 {
                        (Some(c.point()?), Some(c.u64_le()?))
                    } else {
                        (None, None)
                    };
                    entries.push(InputVerificationEntry {
                        a_r,
                        amount,
                        index,
                        origin_tx_type,
                        a_r_stake,
                        i_stake,
                    });
                }
                Some(AuditData {
                    cz_proof,
                    input_verification_data: entries,
                    spend_pubkey: c.point()?,
                    enc_view_privkey: {
                        let len = c.varint()? as usize;
                        c.bytes(len)?.to_vec()
                    },
                })
            } else {
                None
            };
            Ok(Some(SalviumData::Versioned { data_type, pr_proof, sa_proof, audit }))
        }
        _ => Ok(None),
    }
}

fn put_salvium_data(buf: &mut Vec<u8>, sd: &SalviumData) {
    match sd {
        SalviumData::FullProofs { pr_proof, sa_proof } => {
            put_zk_proof(buf, pr_proof);
            put_zk_proof(buf, sa_proof);
        }
        SalviumData::Versioned { data_type, pr_proof, sa_proof, audit } => {
            put_varint(buf, *data_type);
            put_zk_proof(buf, pr_proof);
            put_zk_proof(buf, sa_proof);
            if let Some(a) = audit {
                put_zk_proof(buf, &a.cz_proof);
                put_varint(buf, a.input_verification_data.len() as u64);
                for e in &a.input_verification_data {
                    buf.extend_from_slice(&e.a_r);
                    put_varint(buf, e.amount);
                    put_varint(buf, e.index);
                    put_varint(buf, e.origin_tx_type as u64);
                    if e.origin_tx_type != 0 {
                        buf.extend_from_slice(&e.a_r_stake.unwrap_or([0u8; 32]));
                        buf.extend_from_slice(&e.i_stake.unwrap_or(0).to_le_bytes());
                    }
                }
                buf.extend_from_slice(&a.spend_pubkey);
                put_varint(buf, a.enc_view_privkey.len() as u64);
                buf.extend_from_slice(&a.enc_view_privkey);
            }
        }
    }
}

fn parse_bpp(c: &mut Cursor) -> Result<BppProof, TxError> {
    let point = |c: &mut Cursor| -> Result<_, TxError> {
        let start = c.pos;
        decompress_canonical(&c.arr::<32>()?)
            .map_err(|_| TxError::encoding(start, "invalid proof point"))
    };
    let a = point(c)?;
    let a1 = point(c)?;
    let b = point(c)?;
    let r1 = c.scalar()?;
    let s1 = c.scalar()?;
    let d1 = c.scalar()?;

    let l_count = c.varint()? as usize;
    if !(BPP_MIN_ROUNDS..=BPP_MAX_ROUNDS).contains(&l_count) {
        return Err(TxError::encoding(c.pos, "bulletproof L count out of range"));
    }
    let mut l = Vec::with_capacity(l_count);
    for _ in 0..l_count {
        l.push(point(c)?);
    }
    let r_count = c.varint()? as usize;
    if r_count != l_count {
        return Err(TxError::encoding(c.pos, "bulletproof L/R count mismatch"));
    }
    let mut r = Vec::with_capacity(r_count);
    for _ in 0..r_count {
        r.push(point(c)?);
    }

    Ok(BppProof { v: Vec::new(), a, a1, b, r1, s1, d1, l, r })
}

fn put_bpp(buf: &mut Vec<u8>, p: &BppProof) {
    buf.extend_from_slice(&compress(&p.a));
    buf.extend_from_slice(&compress(&p.a1));
    buf.extend_from_slice(&compress(&p.b));
    buf.extend_from_slice(&p.r1.to_bytes());
    buf.extend_from_slice(&p.s1.to_bytes());
    buf.extend_from_slice(&p.d1.to_bytes());
    put_varint(buf, p.l.len() as u64);
    for e in &p.l {
        buf.extend_from_slice(&compress(e));
    }
    put_varint(buf, p.r.len() as u64);
    for e in &p.r {
        buf.extend_from_slice(&compress(e));
    }
}

fn parse_prunable(
    c: &mut Cursor,
    rct_ty: u8,
    vin: &[TxInput],
) -> Result<RctPrunable, TxError> {
    let mut prunable = RctPrunable::default();
    let input_count = vin.len();

    let bp_count = c.varint()? as usize;
    if bp_count > 1000 {
        return Err(TxError::encoding(c.pos, "implausible bulletproof count"));
    }
    for _ in 0..bp_count {
        prunable.bulletproofs_plus.push(parse_bpp(c)?);
    }

    if rct_ty == rct_type::SALVIUM_ONE {
        for input in vin {
            let ring = input.ring_size();
            let mut sx = Vec::with_capacity(ring);
            let mut sy = Vec::with_capacity(ring);
            for _ in 0..ring {
                sx.push(c.scalar()?);
            }
            for _ in 0..ring {
                sy.push(c.scalar()?);
            }
            prunable.tclsags.push(TclsagSig { sx, sy, c1: c.scalar()?, d: c.point()? });
        }
    } else {
        for input in vin {
            let ring = input.ring_size();
            let mut s = Vec::with_capacity(ring);
            for _ in 0..ring {
                s.push(c.scalar()?);
            }
            prunable.clsags.push(ClsagSig { s, c1: c.scalar()?, d: c.point()? });
        }
    }

    for _ in 0..input_count {
        prunable.pseudo_outs.push(c.point()?);
    }

    Ok(prunable)
}

pub(crate) fn put_prunable(buf: &mut Vec<u8>, prunable: &RctPrunable) {
    put_varint(buf, prunable.bulletproofs_plus.len() as u64);
    for p in &prunable.bulletproofs_plus {
        put_bpp(buf, p);
    }
    for sig in &prunable.tclsags {
        for s in &sig.sx {
            buf.extend_from_slice(&s.to_bytes());
        }
        for s in &sig.sy {
            buf.extend_from_slice(&s.to_bytes());
        }
        buf.extend_from_slice(&sig.c1.to_bytes());
        buf.extend_from_slice(&sig.d);
    }
    for sig in &prunable.clsags {
        for s in &sig.s {
            buf.extend_from_slice(&s.to_bytes());
        }
        buf.extend_from_slice(&sig.c1.to_bytes());
        buf.extend_from_slice(&sig.d);
    }
    for po in &prunable.pseudo_outs {
        buf.extend_from_slice(po);
    }
}

fn parse_rct(c: &mut Cursor, vin: &[TxInput], vout_count: usize) -> Result<RctSignature, TxError> {
    let rct_ty = c.byte()?;
    if rct_ty == rct_type::NULL {
        return Ok(RctSignature { rct_type: rct_type::NULL, ..RctSignature::default() });
    }
    if !(rct_type::BULLETPROOF_PLUS..=rct_type::SALVIUM_ONE).contains(&rct_ty) {
        return Err(TxError::encoding(c.pos - 1, format!("unsupported rct type {rct_ty}")));
    }

    let txn_fee = c.varint()?;
    let mut ecdh_amounts = Vec::with_capacity(vout_count);
    for _ in 0..vout_count {
        ecdh_amounts.push(c.arr::<8>()?);
    }
    let mut out_pk = Vec::with_capacity(vout_count);
    for _ in 0..vout_count {
        out_pk.push(c.point()?);
    }
    let p_r = c.point()?;
    let salvium_data = parse_salvium_data(c, rct_ty)?;

    let prunable = if c.remaining() > 0 {
        Some(parse_prunable(c, rct_ty, vin)?)
    } else {
        None
    };

    Ok(RctSignature {
        rct_type: rct_ty,
        txn_fee,
        ecdh_amounts,
        out_pk,
        p_r,
        salvium_data,
        prunable,
    })
}

/// Serialize the non-prunable RCT half (type, fee, ecdh, outPk, p_r,
/// salvium_data). This exact byte string is also what the pre-signature
/// message hash commits to.
pub fn serialize_rct_base(rct: &RctSignature) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + rct.out_pk.len() * 40);
    buf.push(rct.rct_type);
    if rct.is_null() {
        return buf;
    }
    put_varint(&mut buf, rct.txn_fee);
    for e in &rct.ecdh_amounts {
        buf.extend_from_slice(e);
    }
    for pk in &rct.out_pk {
        buf.extend_from_slice(pk);
    }
    buf.extend_from_slice(&rct.p_r);
    if let Some(sd) = &rct.salvium_data {
        put_salvium_data(&mut buf, sd);
    }
    buf
}

// ─── Whole transaction ──────────────────────────────────────────────────

pub(crate) fn parse_transaction_cursor(c: &mut Cursor) -> Result<Transaction, TxError> {
    let prefix = parse_prefix(c)?;
    if prefix.version == 1 {
        return Ok(Transaction { prefix, rct: None });
    }
    let rct = parse_rct(c, &prefix.vin, prefix.vout.len())?;
    Ok(Transaction { prefix, rct: Some(rct) })
}

/// Parse one complete transaction blob; trailing bytes are an error.
pub fn parse_transaction(bytes: &[u8]) -> Result<Transaction, TxError> {
    let mut c = Cursor::new(bytes);
    let tx = parse_transaction_cursor(&mut c)?;
    if c.remaining() != 0 {
        return Err(TxError::encoding(c.pos, "trailing bytes after transaction"));
    }
    Ok(tx)
}

pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let mut buf = serialize_tx_prefix(&tx.prefix);
    if let Some(rct) = &tx.rct {
        buf.extend_from_slice(&serialize_rct_base(rct));
        if let Some(prunable) = &rct.prunable {
            if !rct.is_null() {
                put_prunable(&mut buf, prunable);
            }
        }
    }
    buf
}

// ─── Blocks ─────────────────────────────────────────────────────────────

fn parse_pricing_record(c: &mut Cursor) -> Result<PricingRecord, TxError> {
    let version = c.varint()?;
    let height = c.varint()?;
    let supply_sal = c.varint()?;
    let supply_vsd = c.varint()?;
    let asset_count = c.varint()? as usize;
    let mut assets = Vec::with_capacity(asset_count.min(64));
    for _ in 0..asset_count {
        assets.push(AssetPrice {
            asset_type: c.string()?,
            spot_price: c.varint()?,
            ma_price: c.varint()?,
        });
    }
    let timestamp = c.varint()?;
    let sig_len = c.varint()? as usize;
    let signature = c.bytes(sig_len)?.to_vec();
    Ok(PricingRecord { version, height, supply_sal, supply_vsd, assets, timestamp, signature })
}

fn put_pricing_record(buf: &mut Vec<u8>, pr: &PricingRecord) {
    put_varint(buf, pr.version);
    put_varint(buf, pr.height);
    put_varint(buf, pr.supply_sal);
    put_varint(buf, pr.supply_vsd);
    put_varint(buf, pr.assets.len() as u64);
    for a in &pr.assets {
        put_string(buf, &a.asset_type);
        put_varint(buf, a.spot_price);
        put_varint(buf, a.ma_price);
    }
    put_varint(buf, pr.timestamp);
    put_varint(buf, pr.signature.len() as u64);
    buf.extend_from_slice(&pr.signature);
}

pub fn parse_block(bytes: &[u8]) -> Result<Block, TxError> {
    let mut c = Cursor::new(bytes);

    let major_version = c.varint()?;
    let minor_version = c.varint()?;
    let timestamp = c.varint()?;
    let prev_id = c.point()?;
    let nonce = c.u32_le()?;
    let pricing_record = if major_version >= HF_VERSION_ENABLE_ORACLE {
        Some(parse_pricing_record(&mut c)?)
    } else {
        None
    };

    let miner_tx = parse_transaction_cursor(&mut c)?;
    let protocol_tx = parse_transaction_cursor(&mut c)?;

    let hash_count = c.varint()? as usize;
    let mut tx_hashes = Vec::with_capacity(hash_count.min(65536));
    for _ in 0..hash_count {
        tx_hashes.push(c.point()?);
    }

    if c.remaining() != 0 {
        return Err(TxError::encoding(c.pos, "trailing bytes after block"));
    }

    Ok(Block {
        header: BlockHeader {
            major_version,
            minor_version,
            timestamp,
            prev_id,
            nonce,
            pricing_record,
        },
        miner_tx,
        protocol_tx,
        tx_hashes,
    })
}

pub fn serialize_block_header(h: &BlockHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    put_varint(&mut buf, h.major_version);
    put_varint(&mut buf, h.minor_version);
    put_varint(&mut buf, h.timestamp);
    buf.extend_from_slice(&h.prev_id);
    buf.extend_from_slice(&h.nonce.to_le_bytes());
    if h.major_version >= HF_VERSION_ENABLE_ORACLE {
        if let Some(pr) = &h.pricing_record {
            put_pricing_record(&mut buf, pr);
        }
    }
    buf
}

pub fn serialize_block(b: &Block) -> Vec<u8> {
    let mut buf = serialize_block_header(&b.header);
    buf.extend_from_slice(&serialize_transaction(&b.miner_tx));
    buf.extend_from_slice(&serialize_transaction(&b.protocol_tx));
    put_varint(&mut buf, b.tx_hashes.len() as u64);
    for h in &b.tx_hashes {
        buf.extend_from_slice(h);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_roundtrip() {
        for v in [0u64, 1, 127, 128, 255, 16384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            put_varint(&mut buf, v);
            let mut c = Cursor::new(&buf);
            assert_eq!(c.varint().unwrap(), v);
            assert_eq!(c.remaining(), 0);
        }
    }

    #[test]
    fn varint_rejects_overflow() {
        // 10 continuation bytes pushing past 64 bits.
        let buf = [0xffu8; 11];
        let mut c = Cursor::new(&buf);
        assert!(c.varint().is_err());
    }

    fn minimal_coinbase() -> Transaction {
        Transaction {
            prefix: TxPrefix {
                version: 4,
                unlock_time: 60,
                vin: vec![TxInput::Gen { height: 1317 }],
                vout: vec![TxOutput {
                    amount: 12_345_678_900,
                    target: TxOutTarget::CarrotV1 {
                        key: sal_crypto::curve::H_BYTES,
                        asset_type: "SAL1".into(),
                        view_tag: [1, 2, 3],
                        encrypted_janus_anchor: [9u8; 16],
                    },
                }],
                extra: vec![0x01; 33],
                tx_type: tx_type::MINER,
                amount_burnt: 42,
                ..TxPrefix::default()
            },
            rct: Some(RctSignature { rct_type: rct_type::NULL, ..RctSignature::default() }),
        }
    }

    #[test]
    fn coinbase_roundtrip() {
        let tx = minimal_coinbase();
        let bytes = serialize_transaction(&tx);
        let parsed = parse_transaction(&bytes).unwrap();
        assert_eq!(serialize_transaction(&parsed), bytes);
        assert_eq!(parsed.prefix.version, 4);
        assert_eq!(parsed.prefix.tx_type, tx_type::MINER);
        assert_eq!(parsed.prefix.amount_burnt, 42);
    }

    #[test]
    fn transfer_prefix_roundtrip_v3_return_list() {
        let prefix = TxPrefix {
            version: 3,
            unlock_time: 0,
            vin: vec![TxInput::ToKey {
                amount: 0,
                asset_type: "SAL1".into(),
                key_offsets: vec![1000, 5, 2, 1],
                key_image: [7u8; 32],
            }],
            vout: vec![TxOutput {
                amount: 0,
                target: TxOutTarget::TaggedKey {
                    key: sal_crypto::curve::H_BYTES,
                    asset_type: "SAL1".into(),
                    unlock_time: 0,
                    view_tag: 0xAB,
                },
            }],
            extra: vec![],
            tx_type: tx_type::TRANSFER,
            amount_burnt: 0,
            return_address_list: vec![[1u8; 32], [2u8; 32]],
            return_address_change_mask: vec![0b01],
            source_asset_type: "SAL1".into(),
            destination_asset_type: "SAL1".into(),
            amount_slippage_limit: 0,
            ..TxPrefix::default()
        };
        let bytes = serialize_tx_prefix(&prefix);
        let mut c = Cursor::new(&bytes);
        let parsed = parse_prefix(&mut c).unwrap();
        assert_eq!(parsed, prefix);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn stake_prefix_carries_protocol_tx_data() {
        let prefix = TxPrefix {
            version: 4,
            vin: vec![],
            vout: vec![],
            tx_type: tx_type::STAKE,
            amount_burnt: 777,
            protocol_tx_data: Some(ProtocolTxData {
                version: 1,
                return_address: [3u8; 32],
                return_pubkey: [4u8; 32],
                return_view_tag: [5, 6, 7],
                return_anchor_enc: [8u8; 16],
            }),
            source_asset_type: "SAL1".into(),
            destination_asset_type: "SAL1".into(),
            ..TxPrefix::default()
        };
        let bytes = serialize_tx_prefix(&prefix);
        let mut c = Cursor::new(&bytes);
        let parsed = parse_prefix(&mut c).unwrap();
        assert_eq!(parsed.protocol_tx_data, prefix.protocol_tx_data);
        assert_eq!(parsed.amount_burnt, 777);
    }

    #[test]
    fn unknown_input_tag_rejected() {
        // version 2, unlock 0, one input with bogus tag.
        let bytes = [0x02, 0x00, 0x01, 0x55];
        assert!(parse_transaction(&bytes).is_err());
    }

    #[test]
    fn truncated_tx_rejected() {
        let tx = minimal_coinbase();
        let bytes = serialize_transaction(&tx);
        assert!(parse_transaction(&bytes[..bytes.len() - 4]).is_err());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let tx = minimal_coinbase();
        let mut bytes = serialize_transaction(&tx);
        bytes.push(0);
        assert!(parse_transaction(&bytes).is_err());
    }

    #[test]
    fn block_roundtrip() {
        let block = Block {
            header: BlockHeader {
                major_version: 10,
                minor_version: 10,
                timestamp: 1_700_000_000,
                prev_id: [0xAA; 32],
                nonce: 0xDEADBEEF,
                pricing_record: None,
            },
            miner_tx: minimal_coinbase(),
            protocol_tx: Transaction {
                prefix: TxPrefix {
                    version: 4,
                    tx_type: tx_type::PROTOCOL,
                    ..TxPrefix::default()
                },
                rct: Some(RctSignature::default()),
            },
            tx_hashes: vec![[0x11; 32], [0x22; 32]],
        };
        let bytes = serialize_block(&block);
        let parsed = parse_block(&bytes).unwrap();
        assert_eq!(serialize_block(&parsed), bytes);
        assert_eq!(parsed.tx_hashes.len(), 2);
        assert_eq!(parsed.header.nonce, 0xDEADBEEF);
    }

    #[test]
    fn pricing_record_roundtrip() {
        let pr = PricingRecord {
            version: 1,
            height: 500,
            supply_sal: 1_000_000,
            supply_vsd: 50_000,
            assets: vec![
                AssetPrice { asset_type: "SAL1".into(), spot_price: 99, ma_price: 101 },
                AssetPrice { asset_type: "VSD".into(), spot_price: 100, ma_price: 100 },
            ],
            timestamp: 1_700_000_123,
            signature: vec![1, 2, 3, 4],
        };
        let mut buf = Vec::new();
        put_pricing_record(&mut buf, &pr);
        let mut c = Cursor::new(&buf);
        assert_eq!(parse_pricing_record(&mut c).unwrap(), pr);
    }
}

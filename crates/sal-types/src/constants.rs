//! Wire tags and protocol identifiers.
//!
//! Values mirror the C++ `cryptonote_protocol/enums.h` and
//! `cryptonote_basic.h` definitions; they appear verbatim in serialized
//! transactions and must never change.

use serde::{Deserialize, Serialize};

/// Transaction type, stored as a varint after the extra field.
pub mod tx_type {
    pub const UNSET: u8 = 0;
    pub const MINER: u8 = 1;
    pub const PROTOCOL: u8 = 2;
    pub const TRANSFER: u8 = 3;
    pub const CONVERT: u8 = 4;
    pub const BURN: u8 = 5;
    pub const STAKE: u8 = 6;
    pub const RETURN: u8 = 7;
    pub const AUDIT: u8 = 8;
}

/// RingCT signature type tag (first byte of the RCT section).
pub mod rct_type {
    pub const NULL: u8 = 0;
    pub const FULL: u8 = 1;
    pub const SIMPLE: u8 = 2;
    pub const BULLETPROOF: u8 = 3;
    pub const BULLETPROOF2: u8 = 4;
    pub const CLSAG: u8 = 5;
    pub const BULLETPROOF_PLUS: u8 = 6;
    pub const FULL_PROOFS: u8 = 7;
    pub const SALVIUM_ZERO: u8 = 8;
    pub const SALVIUM_ONE: u8 = 9;
}

/// Transaction input variant tags.
pub mod txin_tag {
    /// Coinbase input (`txin_gen`).
    pub const GEN: u8 = 0xff;
    /// Ring-signature key input (`txin_to_key`).
    pub const KEY: u8 = 0x02;
}

/// Transaction output variant tags.
pub mod txout_tag {
    pub const KEY: u8 = 0x02;
    /// `txout_to_tagged_key`: adds a 1-byte view tag.
    pub const TAGGED_KEY: u8 = 0x03;
    /// `txout_to_carrot_v1`: 3-byte view tag + 16-byte encrypted anchor.
    pub const CARROT_V1: u8 = 0x04;
}

/// Transaction versions.
pub const TX_VERSION_RCT: u64 = 2;
pub const TX_VERSION_N_OUTS: u64 = 3;
pub const TX_VERSION_CARROT: u64 = 4;

/// Network selector. The wallet core never dials anything itself, but
/// address derivation and hard-fork schedules differ per network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Stagenet,
}

/// On-chain asset identifier. `SAL1` is the post-audit rename of the
/// native coin; `VSD` is the oracle-priced stable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Sal,
    Sal1,
    Vsd,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sal => "SAL",
            Self::Sal1 => "SAL1",
            Self::Vsd => "VSD",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "SAL" => Some(Self::Sal),
            "SAL1" => Some(Self::Sal1),
            "VSD" => Some(Self::Vsd),
            _ => None,
        }
    }

    /// SAL and SAL1 are the same underlying asset across the rename fork.
    pub fn equivalent(a: AssetType, b: AssetType) -> bool {
        let native = |t| matches!(t, Self::Sal | Self::Sal1);
        a == b || (native(a) && native(b))
    }

    /// Whether `src -> dst` is a conversion pair the oracle prices.
    pub fn is_valid_conversion(src: AssetType, dst: AssetType) -> bool {
        matches!(
            (src, dst),
            (Self::Sal1, Self::Vsd) | (Self::Sal, Self::Vsd) | (Self::Vsd, Self::Sal1)
        )
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_roundtrip() {
        for a in [AssetType::Sal, AssetType::Sal1, AssetType::Vsd] {
            assert_eq!(AssetType::from_str_opt(a.as_str()), Some(a));
        }
        assert_eq!(AssetType::from_str_opt("XYZ"), None);
    }

    #[test]
    fn conversion_pairs() {
        assert!(AssetType::is_valid_conversion(AssetType::Sal1, AssetType::Vsd));
        assert!(AssetType::is_valid_conversion(AssetType::Vsd, AssetType::Sal1));
        assert!(!AssetType::is_valid_conversion(AssetType::Vsd, AssetType::Vsd));
        assert!(!AssetType::is_valid_conversion(AssetType::Sal, AssetType::Sal1));
    }

    #[test]
    fn sal_rename_equivalence() {
        assert!(AssetType::equivalent(AssetType::Sal, AssetType::Sal1));
        assert!(!AssetType::equivalent(AssetType::Sal, AssetType::Vsd));
    }
}

//! Wallet key hierarchy: the legacy CryptoNote pair plus the CARROT
//! tree, both derived from one 32-byte seed.

use curve25519_dalek::scalar::Scalar;

use sal_crypto::carrot::CarrotKeys;
use sal_crypto::curve::{compress, mul_base, reduce32};
use sal_crypto::keccak256;
use sal_types::Network;

use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletType {
    /// Can scan and spend.
    Full,
    /// Can scan but not spend.
    ViewOnly,
}

/// Legacy CryptoNote keys: `spend = reduce32(seed)`,
/// `view = reduce32(keccak(spend))`.
#[derive(Clone)]
pub struct LegacyKeys {
    pub spend_secret: Option<Scalar>,
    pub spend_public: [u8; 32],
    pub view_secret: Scalar,
    pub view_public: [u8; 32],
}

pub struct WalletKeys {
    pub wallet_type: WalletType,
    pub network: Network,
    pub legacy: LegacyKeys,
    pub carrot: CarrotKeys,
}

impl WalletKeys {
    pub fn from_seed(seed: &[u8; 32], network: Network) -> Self {
        let spend_secret = reduce32(*seed);
        let view_secret = reduce32(keccak256(&spend_secret.to_bytes()));
        Self {
            wallet_type: WalletType::Full,
            network,
            legacy: LegacyKeys {
                spend_public: compress(&mul_base(&spend_secret)),
                view_public: compress(&mul_base(&view_secret)),
                spend_secret: Some(spend_secret),
                view_secret,
            },
            carrot: CarrotKeys::from_master(seed),
        }
    }

    /// View-only wallet from the public spend halves and view secrets.
    pub fn view_only(
        legacy_spend_public: [u8; 32],
        legacy_view_secret: Scalar,
        carrot_view_balance_secret: [u8; 32],
        carrot_spend_pubkey: [u8; 32],
        network: Network,
    ) -> Result<Self, WalletError> {
        let carrot = CarrotKeys::view_only(carrot_view_balance_secret, carrot_spend_pubkey)
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        Ok(Self {
            wallet_type: WalletType::ViewOnly,
            network,
            legacy: LegacyKeys {
                spend_public: legacy_spend_public,
                view_public: compress(&mul_base(&legacy_view_secret)),
                spend_secret: None,
                view_secret: legacy_view_secret,
            },
            carrot,
        })
    }

    pub fn can_spend(&self) -> bool {
        self.wallet_type == WalletType::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = WalletKeys::from_seed(&[7; 32], Network::Testnet);
        let b = WalletKeys::from_seed(&[7; 32], Network::Testnet);
        assert_eq!(a.legacy.spend_public, b.legacy.spend_public);
        assert_eq!(a.legacy.view_public, b.legacy.view_public);
        assert_eq!(a.carrot.account_spend_pubkey, b.carrot.account_spend_pubkey);
    }

    #[test]
    fn view_key_is_hash_of_spend_key() {
        let keys = WalletKeys::from_seed(&[9; 32], Network::Mainnet);
        let spend = keys.legacy.spend_secret.unwrap();
        let expected = reduce32(keccak256(&spend.to_bytes()));
        assert_eq!(keys.legacy.view_secret, expected);
    }

    #[test]
    fn view_only_matches_full_wallet() {
        let full = WalletKeys::from_seed(&[3; 32], Network::Mainnet);
        let vo = WalletKeys::view_only(
            full.legacy.spend_public,
            full.legacy.view_secret,
            full.carrot.view_balance_secret,
            full.carrot.account_spend_pubkey,
            Network::Mainnet,
        )
        .unwrap();
        assert!(!vo.can_spend());
        assert_eq!(vo.legacy.view_public, full.legacy.view_public);
        assert_eq!(vo.carrot.view_incoming_key, full.carrot.view_incoming_key);
    }
}

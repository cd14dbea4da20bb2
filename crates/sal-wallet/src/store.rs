//! The wallet-store interface and the canonical output record.
//!
//! Persistence is injected: the core never opens files or sockets. A
//! reference in-memory implementation backs the tests and doubles as
//! the semantic specification for real backends. Per-block mutations
//! must be atomic at this interface, and `rollback` must undo outputs,
//! transactions, block hashes, and spent marks above the kept height in
//! one step.

use std::collections::HashMap;

use curve25519_dalek::scalar::Scalar;

use sal_crypto::curve::compress;
use sal_crypto::pedersen;
use sal_types::consensus::is_unlocked;

use crate::error::StoreError;

/// An output the wallet owns. Invariant: `commit(amount, mask)` equals
/// `commitment`; enforced when records enter the store.
#[derive(Debug, Clone)]
pub struct WalletOutput {
    /// `None` on view-only wallets (no spend capability).
    pub key_image: Option<[u8; 32]>,
    pub public_key: [u8; 32],
    pub tx_hash: [u8; 32],
    pub output_index: u32,
    pub global_index: u64,
    pub block_height: u64,
    pub unlock_time: u64,
    pub amount: u64,
    pub asset_type: String,
    pub mask: Scalar,
    pub commitment: [u8; 32],
    pub subaddress_major: u32,
    pub subaddress_minor: u32,
    pub is_carrot: bool,
    pub carrot_enote_type: Option<u8>,
    /// Contextualized shared secret, needed to derive spend keys later.
    pub carrot_shared_secret: Option<[u8; 32]>,
    pub is_spent: bool,
    pub spent_height: Option<u64>,
    pub spent_tx: Option<[u8; 32]>,
    pub is_frozen: bool,
}

impl WalletOutput {
    pub fn commitment_is_consistent(&self) -> bool {
        compress(&pedersen::commit(self.amount, &self.mask)) == self.commitment
    }
}

/// A wallet-relevant transaction summary.
#[derive(Debug, Clone)]
pub struct WalletTransaction {
    pub tx_hash: [u8; 32],
    pub block_height: u64,
    pub timestamp: u64,
    pub amount_received: u64,
    pub amount_spent: u64,
    pub fee: u64,
    pub asset_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub balance: u64,
    pub unlocked_balance: u64,
    pub locked_balance: u64,
}

/// Filter for output queries; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct OutputFilter {
    pub asset_type: Option<String>,
    pub account_index: Option<u32>,
    pub unspent_only: bool,
}

impl OutputFilter {
    fn matches(&self, out: &WalletOutput) -> bool {
        if self.unspent_only && out.is_spent {
            return false;
        }
        if let Some(asset) = &self.asset_type {
            if &out.asset_type != asset {
                return false;
            }
        }
        if let Some(account) = self.account_index {
            if out.subaddress_major != account {
                return false;
            }
        }
        true
    }
}

/// Injected persistence. All methods are fallible with an opaque error
/// the core reports verbatim.
pub trait WalletStore {
    fn clear(&mut self) -> Result<(), StoreError>;

    fn put_output(&mut self, output: WalletOutput) -> Result<(), StoreError>;
    fn get_output(&self, public_key: &[u8; 32]) -> Result<Option<WalletOutput>, StoreError>;
    fn get_output_by_key_image(
        &self,
        key_image: &[u8; 32],
    ) -> Result<Option<WalletOutput>, StoreError>;
    fn get_outputs(&self, filter: &OutputFilter) -> Result<Vec<WalletOutput>, StoreError>;
    fn mark_spent(
        &mut self,
        key_image: &[u8; 32],
        spent_tx: [u8; 32],
        height: u64,
    ) -> Result<bool, StoreError>;

    fn put_transaction(&mut self, tx: WalletTransaction) -> Result<(), StoreError>;
    fn get_transactions(&self) -> Result<Vec<WalletTransaction>, StoreError>;

    fn sync_height(&self) -> Result<u64, StoreError>;
    fn set_sync_height(&mut self, height: u64) -> Result<(), StoreError>;

    fn block_hash(&self, height: u64) -> Result<Option<[u8; 32]>, StoreError>;
    fn set_block_hash(&mut self, height: u64, hash: [u8; 32]) -> Result<(), StoreError>;

    /// Atomically delete outputs, transactions, and block hashes above
    /// `height`, and un-spend outputs spent above it.
    fn rollback(&mut self, height: u64) -> Result<(), StoreError>;

    /// Balance per asset and account at the given chain height.
    fn get_balance(
        &self,
        current_height: u64,
        asset_type: &str,
        account_index: u32,
    ) -> Result<Balance, StoreError> {
        let filter = OutputFilter {
            asset_type: Some(asset_type.to_string()),
            account_index: Some(account_index),
            unspent_only: true,
        };
        let mut balance = Balance::default();
        for out in self.get_outputs(&filter)? {
            if out.is_frozen {
                continue;
            }
            balance.balance += out.amount;
            if is_unlocked(out.unlock_time, out.block_height, current_height) {
                balance.unlocked_balance += out.amount;
            } else {
                balance.locked_balance += out.amount;
            }
        }
        Ok(balance)
    }
}

/// Reference store used by tests; real wallets inject a database.
#[derive(Default)]
pub struct MemoryStore {
    outputs: Vec<WalletOutput>,
    transactions: Vec<WalletTransaction>,
    block_hashes: HashMap<u64, [u8; 32]>,
    sync_height: u64,
}

impl WalletStore for MemoryStore {
    fn clear(&mut self) -> Result<(), StoreError> {
        *self = MemoryStore::default();
        Ok(())
    }

    fn put_output(&mut self, output: WalletOutput) -> Result<(), StoreError> {
        if !output.commitment_is_consistent() {
            return Err("output commitment does not open to amount/mask".into());
        }
        // Replace on re-scan of the same output.
        self.outputs.retain(|o| o.public_key != output.public_key);
        self.outputs.push(output);
        Ok(())
    }

    fn get_output(&self, public_key: &[u8; 32]) -> Result<Option<WalletOutput>, StoreError> {
        Ok(self.outputs.iter().find(|o| &o.public_key == public_key).cloned())
    }

    fn get_output_by_key_image(
        &self,
        key_image: &[u8; 32],
    ) -> Result<Option<WalletOutput>, StoreError> {
        Ok(self
            .outputs
            .iter()
            .find(|o| o.key_image.as_ref() == Some(key_image))
            .cloned())
    }

    fn get_outputs(&self, filter: &OutputFilter) -> Result<Vec<WalletOutput>, StoreError> {
        Ok(self.outputs.iter().filter(|o| filter.matches(o)).cloned().collect())
    }

    fn mark_spent(
        &mut self,
        key_image: &[u8; 32],
        spent_tx: [u8; 32],
        height: u64,
    ) -> Result<bool, StoreError> {
        for out in &mut self.outputs {
            if out.key_image.as_ref() == Some(key_image) {
                out.is_spent = true;
                out.spent_height = Some(height);
                out.spent_tx = Some(spent_tx);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn put_transaction(&mut self, tx: WalletTransaction) -> Result<(), StoreError> {
        self.transactions.retain(|t| t.tx_hash != tx.tx_hash);
        self.transactions.push(tx);
        Ok(())
    }

    fn get_transactions(&self) -> Result<Vec<WalletTransaction>, StoreError> {
        Ok(self.transactions.clone())
    }

    fn sync_height(&self) -> Result<u64, StoreError> {
        Ok(self.sync_height)
    }

    fn set_sync_height(&mut self, height: u64) -> Result<(), StoreError> {
        self.sync_height = height;
        Ok(())
    }

    fn block_hash(&self, height: u64) -> Result<Option<[u8; 32]>, StoreError> {
        Ok(self.block_hashes.get(&height).copied())
    }

    fn set_block_hash(&mut self, height: u64, hash: [u8; 32]) -> Result<(), StoreError> {
        self.block_hashes.insert(height, hash);
        Ok(())
    }

    fn rollback(&mut self, height: u64) -> Result<(), StoreError> {
        self.outputs.retain(|o| o.block_height <= height);
        for out in &mut self.outputs {
            if out.spent_height.map(|h| h > height).unwrap_or(false) {
                out.is_spent = false;
                out.spent_height = None;
                out.spent_tx = None;
            }
        }
        self.transactions.retain(|t| t.block_height <= height);
        self.block_hashes.retain(|&h, _| h <= height);
        self.sync_height = self.sync_height.min(height);
        Ok(())
    }
}

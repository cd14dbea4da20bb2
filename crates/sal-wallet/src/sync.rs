//! Blockchain sync: drive the scanner over a height range, persist
//! results, handle reorgs, surface progress through an observer.
//!
//! The engine is synchronous; the caller owns threading. Cancellation is
//! a shared atomic checked at least once per block, and every block's
//! store mutations happen before its hash and the advanced sync height
//! are recorded, so an interruption never leaves a torn prefix.

use std::sync::atomic::{AtomicBool, Ordering};

use sal_tx::parse_transaction;
use sal_tx::types::Transaction;

use crate::chain::{ChainSource, FetchedBlock};
use crate::error::WalletError;
use crate::scanner::{self, ScanContext, TxContext};
use crate::store::{WalletStore, WalletTransaction};

/// Sync callbacks, invoked from the syncing thread.
pub trait SyncObserver {
    fn on_progress(&self, _current: u64, _target: u64, _found: usize) {}
    fn on_new_block(&self, _height: u64, _hash: &[u8; 32]) {}
    fn on_reorg(&self, _from: u64, _to: u64) {}
    fn on_error(&self, _error: &WalletError) {}
}

/// No-op observer.
pub struct NullSyncObserver;
impl SyncObserver for NullSyncObserver {}

/// How far back to search for a fork point before giving up and
/// rescanning from genesis.
const MAX_REORG_DEPTH: u64 = 100;

pub struct SyncEngine;

impl SyncEngine {
    /// Sync from the store's height to the chain tip. Returns the new
    /// sync height.
    pub fn sync(
        chain: &dyn ChainSource,
        store: &mut dyn WalletStore,
        ctx: &ScanContext,
        observer: &dyn SyncObserver,
        stop: &AtomicBool,
    ) -> Result<u64, WalletError> {
        let info = chain.get_info().map_err(WalletError::Chain)?;
        let target = info.height.saturating_sub(1);
        let mut current = store.sync_height().map_err(WalletError::Store)?;

        // Tip consistency: the block we recorded at `current` must still
        // be on the chain, or the reorg happened behind our back while
        // no new blocks arrived.
        if current > 0 && current <= target {
            if let Some(known) = store.block_hash(current).map_err(WalletError::Store)? {
                let tip = chain
                    .get_block_headers(current, current)
                    .map_err(WalletError::Chain)?;
                let matches = tip.first().map(|h| h.hash == known).unwrap_or(false);
                if !matches {
                    let fork = Self::find_fork_point(chain, store, current)?;
                    log::warn!("tip mismatch at {}, rolling back to {}", current, fork);
                    observer.on_reorg(current, fork);
                    store.rollback(fork).map_err(WalletError::Store)?;
                    current = fork;
                }
            }
        }

        if current >= target {
            return Ok(current);
        }
        log::info!("syncing wallet from {} to {}", current, target);

        while current < target {
            if stop.load(Ordering::Relaxed) {
                return Err(WalletError::Cancelled);
            }

            let next = current + 1;
            let fetched = chain.get_block(next).map_err(WalletError::Chain)?;

            // Reorg detection: the new block must extend the block we
            // recorded at `current`.
            if current > 0 {
                if let Some(known) = store.block_hash(current).map_err(WalletError::Store)? {
                    if fetched.block.header.prev_id != known {
                        let fork = Self::find_fork_point(chain, store, current)?;
                        log::warn!("reorg detected at {}, rolling back to {}", next, fork);
                        observer.on_reorg(next, fork);
                        store.rollback(fork).map_err(WalletError::Store)?;
                        current = fork;
                        continue;
                    }
                }
            }

            let found = match Self::process_block(chain, store, ctx, &fetched) {
                Ok(found) => found,
                Err(err) => {
                    observer.on_error(&err);
                    return Err(err);
                }
            };

            store
                .set_block_hash(next, fetched.hash)
                .map_err(WalletError::Store)?;
            store.set_sync_height(next).map_err(WalletError::Store)?;
            observer.on_new_block(next, &fetched.hash);
            observer.on_progress(next, target, found);
            current = next;
        }

        Ok(current)
    }

    /// Walk back until the store's hash matches the chain's.
    fn find_fork_point(
        chain: &dyn ChainSource,
        store: &mut dyn WalletStore,
        from: u64,
    ) -> Result<u64, WalletError> {
        let low = from.saturating_sub(MAX_REORG_DEPTH);
        let headers = chain
            .get_block_headers(low, from)
            .map_err(WalletError::Chain)?;
        let mut height = from;
        while height > low {
            let ours = store.block_hash(height).map_err(WalletError::Store)?;
            let theirs = headers.iter().find(|h| h.height == height).map(|h| h.hash);
            match (ours, theirs) {
                (Some(a), Some(b)) if a == b => return Ok(height),
                (None, _) => return Ok(height.saturating_sub(1)),
                _ => height -= 1,
            }
        }
        Ok(low)
    }

    /// Scan one block's transactions and apply the results. Store
    /// mutations for the block happen before the caller records its
    /// hash, keeping interrupted syncs resumable.
    fn process_block(
        chain: &dyn ChainSource,
        store: &mut dyn WalletStore,
        ctx: &ScanContext,
        fetched: &FetchedBlock,
    ) -> Result<usize, WalletError> {
        let block = &fetched.block;
        let mut found_total = 0;

        // Miner and protocol tx scan with the coinbase rules.
        for (tx, indices) in [
            (&block.miner_tx, &fetched.output_indices.miner),
            (&block.protocol_tx, &fetched.output_indices.protocol),
        ] {
            found_total += Self::apply_tx(store, ctx, tx, fetched, indices, true)?;
        }

        // Listed transactions are fetched as raw blobs. The daemon call
        // happens before any store mutation for them.
        if !block.tx_hashes.is_empty() {
            let blobs = chain
                .get_transactions(&block.tx_hashes)
                .map_err(WalletError::Chain)?;
            if blobs.len() != block.tx_hashes.len() {
                return Err(WalletError::ChainInconsistency {
                    height: fetched.height,
                    what: format!(
                        "daemon returned {} blobs for {} tx hashes",
                        blobs.len(),
                        block.tx_hashes.len()
                    ),
                });
            }
            let empty: Vec<u64> = Vec::new();
            for (i, blob) in blobs.iter().enumerate() {
                let tx = parse_transaction(blob)?;
                let indices = fetched.output_indices.txs.get(i).unwrap_or(&empty);
                found_total += Self::apply_tx(store, ctx, &tx, fetched, indices, false)?;
            }
        }

        Ok(found_total)
    }

    fn apply_tx(
        store: &mut dyn WalletStore,
        ctx: &ScanContext,
        tx: &Transaction,
        fetched: &FetchedBlock,
        output_indices: &[u64],
        coinbase_block_pos: bool,
    ) -> Result<usize, WalletError> {
        let tx_hash = sal_tx::tx_hash(tx);
        let is_coinbase = coinbase_block_pos || scanner::is_coinbase_type(tx.prefix.tx_type);
        let meta = TxContext {
            tx_hash,
            block_height: fetched.height,
            is_coinbase,
            output_indices,
        };

        let found = scanner::scan_transaction(ctx, tx, &meta)?;
        let found_count = found.len();
        let mut received = 0u64;
        for output in found {
            received += output.amount;
            store.put_output(output).map_err(WalletError::Store)?;
        }

        // Spend detection by key image.
        let mut spent = 0u64;
        for key_image in scanner::spent_key_images(tx) {
            if let Some(out) = store
                .get_output_by_key_image(&key_image)
                .map_err(WalletError::Store)?
            {
                if !out.is_spent {
                    spent += out.amount;
                    store
                        .mark_spent(&key_image, tx_hash, fetched.height)
                        .map_err(WalletError::Store)?;
                }
            }
        }

        if received > 0 || spent > 0 {
            let fee = tx.rct.as_ref().map(|r| r.txn_fee).unwrap_or(0);
            store
                .put_transaction(WalletTransaction {
                    tx_hash,
                    block_height: fetched.height,
                    timestamp: fetched.block.header.timestamp,
                    amount_received: received,
                    amount_spent: spent,
                    fee,
                    asset_type: tx
                        .prefix
                        .vout
                        .first()
                        .map(|o| o.target.asset_type().to_string())
                        .unwrap_or_default(),
                })
                .map_err(WalletError::Store)?;
        }

        Ok(found_count)
    }

    /// Scan unconfirmed transactions. Results are returned, not stored:
    /// mempool contents are not chain state and must not move the sync
    /// height or survive a restart.
    pub fn scan_mempool(
        chain: &dyn ChainSource,
        ctx: &ScanContext,
    ) -> Result<Vec<crate::store::WalletOutput>, WalletError> {
        let blobs = chain.get_mempool().map_err(WalletError::Chain)?;
        let mut found = Vec::new();
        for blob in &blobs {
            let tx = match parse_transaction(blob) {
                Ok(tx) => tx,
                Err(err) => {
                    // A malformed pool tx is the daemon's problem, not a
                    // sync failure.
                    log::warn!("skipping unparseable mempool tx: {err}");
                    continue;
                }
            };
            let meta = TxContext {
                tx_hash: sal_tx::tx_hash(&tx),
                block_height: 0,
                is_coinbase: false,
                output_indices: &[],
            };
            found.extend(scanner::scan_transaction(ctx, &tx, &meta)?);
        }
        Ok(found)
    }
}

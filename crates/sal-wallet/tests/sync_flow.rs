//! Sync-engine behavior against a synthetic chain: discovery, balance,
//! spend detection, cancellation, and reorg rollback.

use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use sal_crypto::keccak256;
use sal_tx::carrot::{build_payment_enote, make_input_context_coinbase, EnoteParams};
use sal_tx::types::*;
use sal_types::{tx_type, Network};
use sal_wallet::chain::{
    BlockOutputIndices, ChainError, ChainInfo, ChainSource, FetchedBlock, HeaderInfo,
    RingMemberInfo,
};
use sal_wallet::{
    MemoryStore, NullSyncObserver, OutputFilter, ScanContext, SyncEngine, SyncObserver,
    WalletKeys, WalletStore,
};

/// A block as the mock daemon stores it.
#[derive(Clone)]
struct MockBlock {
    block: Block,
    hash: [u8; 32],
    txs: Vec<Vec<u8>>,
    indices: BlockOutputIndices,
}

#[derive(Default)]
struct MockChain {
    blocks: Vec<MockBlock>,
}

impl MockChain {
    /// Append a block whose miner tx pays `amount` to `recipient`
    /// (None = unrelated wallet).
    fn push_block(&mut self, recipient: Option<&WalletKeys>, amount: u64) {
        let height = self.blocks.len() as u64 + 1;
        let other = WalletKeys::from_seed(&[0xEE; 32], Network::Testnet);
        let keys = recipient.unwrap_or(&other);

        let ctx = make_input_context_coinbase(height);
        let enote = build_payment_enote(&EnoteParams {
            recipient_spend_pubkey: &keys.carrot.account_spend_pubkey,
            recipient_view_pubkey: &keys.carrot.primary_address_view_pubkey,
            amount,
            input_context: &ctx,
            payment_id: [0u8; 8],
            is_subaddress: false,
            is_coinbase: true,
        })
        .unwrap();

        let mut extra = Vec::new();
        extra.push(0x01);
        extra.extend_from_slice(&enote.ephemeral_pubkey);

        let miner_tx = Transaction {
            prefix: TxPrefix {
                version: 4,
                unlock_time: 60,
                vin: vec![TxInput::Gen { height }],
                vout: vec![TxOutput {
                    amount,
                    target: TxOutTarget::CarrotV1 {
                        key: enote.onetime_address,
                        asset_type: "SAL1".into(),
                        view_tag: enote.view_tag,
                        encrypted_janus_anchor: enote.encrypted_anchor,
                    },
                }],
                extra,
                tx_type: tx_type::MINER,
                ..TxPrefix::default()
            },
            rct: Some(RctSignature::default()),
        };

        let prev_hash = self.blocks.last().map(|b| b.hash).unwrap_or([0u8; 32]);
        let block = Block {
            header: BlockHeader {
                major_version: 10,
                minor_version: 10,
                timestamp: 1_700_000_000 + height,
                prev_id: prev_hash,
                nonce: height as u32,
                pricing_record: None,
            },
            miner_tx,
            protocol_tx: Transaction {
                prefix: TxPrefix { version: 4, tx_type: tx_type::PROTOCOL, ..TxPrefix::default() },
                rct: Some(RctSignature::default()),
            },
            tx_hashes: vec![],
        };
        let hash = keccak256(&sal_tx::serialize_block(&block));
        let global = height * 10;
        self.blocks.push(MockBlock {
            block,
            hash,
            txs: vec![],
            indices: BlockOutputIndices {
                miner: vec![global],
                protocol: vec![],
                txs: vec![],
            },
        });
    }

    /// Replace the chain from `height` on (simulated reorg); the new
    /// branch pays nothing to anyone.
    fn reorg_from(&mut self, height: u64) {
        self.blocks.truncate(height as usize - 1);
        self.push_block(None, 1);
        self.push_block(None, 1);
    }
}

impl ChainSource for MockChain {
    fn get_info(&self) -> Result<ChainInfo, ChainError> {
        Ok(ChainInfo { height: self.blocks.len() as u64 + 1 })
    }

    fn get_block_headers(&self, start: u64, end: u64) -> Result<Vec<HeaderInfo>, ChainError> {
        Ok(self
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                let height = i as u64 + 1;
                (height >= start && height <= end).then(|| HeaderInfo {
                    height,
                    hash: b.hash,
                    timestamp: b.block.header.timestamp,
                })
            })
            .collect())
    }

    fn get_block(&self, height: u64) -> Result<FetchedBlock, ChainError> {
        let b = self
            .blocks
            .get(height as usize - 1)
            .ok_or("height beyond chain tip")?;
        Ok(FetchedBlock {
            height,
            hash: b.hash,
            block: b.block.clone(),
            output_indices: b.indices.clone(),
        })
    }

    fn get_transactions(&self, hashes: &[[u8; 32]]) -> Result<Vec<Vec<u8>>, ChainError> {
        let mut out = Vec::new();
        for hash in hashes {
            let blob = self
                .blocks
                .iter()
                .flat_map(|b| b.txs.iter())
                .find(|blob| sal_tx::tx_hash(&sal_tx::parse_transaction(blob).unwrap()) == *hash)
                .cloned()
                .ok_or("unknown tx hash")?;
            out.push(blob);
        }
        Ok(out)
    }

    fn get_mempool(&self) -> Result<Vec<Vec<u8>>, ChainError> {
        Ok(vec![])
    }

    fn get_output_distribution(&self) -> Result<Vec<u64>, ChainError> {
        Ok((1..=self.blocks.len() as u64).map(|h| h * 10).collect())
    }

    fn get_outputs(&self, _indices: &[u64]) -> Result<Vec<RingMemberInfo>, ChainError> {
        Ok(vec![])
    }
}

fn wallet_ctx(seed: u8) -> ScanContext {
    ScanContext::new(WalletKeys::from_seed(&[seed; 32], Network::Testnet), 0, 0).unwrap()
}

#[test]
fn sync_discovers_coinbase_outputs() {
    let mut chain = MockChain::default();
    let ctx = wallet_ctx(0x51);
    chain.push_block(Some(&ctx.keys), 5_000);
    chain.push_block(None, 1);
    chain.push_block(Some(&ctx.keys), 7_000);

    let mut store = MemoryStore::default();
    let stop = AtomicBool::new(false);
    let height =
        SyncEngine::sync(&chain, &mut store, &ctx, &NullSyncObserver, &stop).unwrap();
    assert_eq!(height, 3);

    let outputs = store.get_outputs(&OutputFilter::default()).unwrap();
    assert_eq!(outputs.len(), 2);
    let total: u64 = outputs.iter().map(|o| o.amount).sum();
    assert_eq!(total, 12_000);
    for out in &outputs {
        assert!(out.is_carrot);
        assert!(out.commitment_is_consistent());
        assert!(out.key_image.is_some());
    }

    // Coinbase stays locked until the unlock window passes.
    let balance = store.get_balance(3, "SAL1", 0).unwrap();
    assert_eq!(balance.balance, 12_000);
    assert_eq!(balance.unlocked_balance, 0);
    let later = store.get_balance(100, "SAL1", 0).unwrap();
    assert_eq!(later.unlocked_balance, 12_000);
}

#[test]
fn sync_is_idempotent() {
    let mut chain = MockChain::default();
    let ctx = wallet_ctx(0x52);
    chain.push_block(Some(&ctx.keys), 100);

    let mut store = MemoryStore::default();
    let stop = AtomicBool::new(false);
    SyncEngine::sync(&chain, &mut store, &ctx, &NullSyncObserver, &stop).unwrap();
    SyncEngine::sync(&chain, &mut store, &ctx, &NullSyncObserver, &stop).unwrap();
    assert_eq!(store.get_outputs(&OutputFilter::default()).unwrap().len(), 1);
}

#[test]
fn cancellation_unwinds_cleanly() {
    let mut chain = MockChain::default();
    let ctx = wallet_ctx(0x53);
    chain.push_block(None, 1);

    let mut store = MemoryStore::default();
    let stop = AtomicBool::new(true);
    let err = SyncEngine::sync(&chain, &mut store, &ctx, &NullSyncObserver, &stop).unwrap_err();
    assert!(matches!(err, sal_wallet::WalletError::Cancelled));
    assert_eq!(store.sync_height().unwrap(), 0);
}

#[test]
fn reorg_rolls_back_orphaned_outputs() {
    struct ReorgWatch(Mutex<Vec<(u64, u64)>>);
    impl SyncObserver for ReorgWatch {
        fn on_reorg(&self, from: u64, to: u64) {
            self.0.lock().unwrap().push((from, to));
        }
    }

    let mut chain = MockChain::default();
    let ctx = wallet_ctx(0x54);
    chain.push_block(None, 1);
    chain.push_block(Some(&ctx.keys), 9_000); // height 2, will be orphaned
    chain.push_block(None, 1);

    let mut store = MemoryStore::default();
    let stop = AtomicBool::new(false);
    SyncEngine::sync(&chain, &mut store, &ctx, &NullSyncObserver, &stop).unwrap();
    assert_eq!(store.get_outputs(&OutputFilter::default()).unwrap().len(), 1);

    // Replace heights 2.. with a branch that pays us nothing.
    chain.reorg_from(2);
    let watch = ReorgWatch(Mutex::new(Vec::new()));
    SyncEngine::sync(&chain, &mut store, &ctx, &watch, &stop).unwrap();

    assert!(!watch.0.lock().unwrap().is_empty(), "observer must see the reorg");
    assert!(
        store.get_outputs(&OutputFilter::default()).unwrap().is_empty(),
        "orphaned output must be rolled back"
    );
    assert_eq!(store.sync_height().unwrap(), 3);
}

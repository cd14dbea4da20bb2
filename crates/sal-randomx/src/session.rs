//! Mining session: seed lifecycle, dataset mode, worker pool.
//!
//! State machine: `Uninit -> InitializingCache -> [BuildingDataset] ->
//! Ready <-> Hashing`; a seed change tears the cache (and dataset) down
//! and re-enters initialization. Workers share the read-only dataset
//! without locks and poll a stop flag between hashes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};

use sal_types::difficulty::hash_meets_difficulty;

use crate::cache::Cache;
use crate::dataset::{Dataset, DatasetSource};
use crate::error::RandomxError;
use crate::vm::Vm;

/// Light mode re-derives dataset items per access (256 MiB per
/// process); full mode precomputes ~2 GiB once and hashes much faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningMode {
    Light,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninit,
    InitializingCache,
    BuildingDataset,
    Ready,
    Hashing,
}

/// A block template to grind.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub hashing_blob: Vec<u8>,
    pub difficulty: u128,
    pub nonce_offset: usize,
    pub height: u64,
}

/// A nonce that met the target.
#[derive(Debug, Clone)]
pub struct FoundShare {
    pub nonce: u32,
    pub hash: [u8; 32],
    pub height: u64,
}

/// Observer for session events, called from the owning/worker threads.
pub trait MiningObserver: Send + Sync {
    fn on_state(&self, _state: SessionState) {}
    fn on_dataset_progress(&self, _done: u64, _total: u64) {}
    fn on_share_found(&self, _share: &FoundShare) {}
}

/// No-op observer.
pub struct NullObserver;
impl MiningObserver for NullObserver {}

pub struct MiningSession {
    mode: MiningMode,
    state: SessionState,
    seed: Vec<u8>,
    cache: Option<Arc<Cache>>,
    dataset: Option<Arc<Dataset>>,
    stop: Arc<AtomicBool>,
    hash_count: Arc<AtomicU64>,
}

impl MiningSession {
    pub fn new(mode: MiningMode) -> Self {
        Self {
            mode,
            state: SessionState::Uninit,
            seed: Vec::new(),
            cache: None,
            dataset: None,
            stop: Arc::new(AtomicBool::new(false)),
            hash_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn hash_count(&self) -> u64 {
        self.hash_count.load(Ordering::Relaxed)
    }

    /// Cooperative stop; checked between hashes and dataset chunks.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Install `seed`, rebuilding the cache (and dataset in full mode)
    /// when it changed. Blocking; emits progress through `observer`.
    pub fn set_seed(
        &mut self,
        seed: &[u8],
        threads: usize,
        observer: &dyn MiningObserver,
    ) -> Result<(), RandomxError> {
        if self.seed == seed && self.cache.is_some() {
            return Ok(());
        }
        // Seed change invalidates everything derived from it.
        self.dataset = None;
        self.cache = None;
        self.seed = seed.to_vec();

        self.state = SessionState::InitializingCache;
        observer.on_state(self.state);
        let cache = Arc::new(Cache::new(seed));
        self.cache = Some(Arc::clone(&cache));

        if self.mode == MiningMode::Full {
            self.state = SessionState::BuildingDataset;
            observer.on_state(self.state);
            let progress = |done: u64, total: u64| observer.on_dataset_progress(done, total);
            let built = Dataset::build(&cache, threads, 16384, Some(&self.stop), Some(&progress));
            match built {
                Some(ds) => self.dataset = Some(Arc::new(ds)),
                None => return Err(RandomxError::Cancelled),
            }
        }

        self.state = SessionState::Ready;
        observer.on_state(self.state);
        Ok(())
    }

    fn source(&self) -> Result<DatasetSource<'_>, RandomxError> {
        match self.mode {
            MiningMode::Full => self
                .dataset
                .as_deref()
                .map(DatasetSource::Full)
                .ok_or(RandomxError::NotReady),
            MiningMode::Light => self
                .cache
                .as_deref()
                .map(DatasetSource::Light)
                .ok_or(RandomxError::NotReady),
        }
    }

    /// One-shot hash of an arbitrary blob (template validation, tests).
    pub fn hash_blob(&self, blob: &[u8]) -> Result<[u8; 32], RandomxError> {
        let source = self.source()?;
        let mut vm = Vm::new(source);
        Ok(vm.hash(blob))
    }

    /// Grind `job` on `threads` workers until a share is found, the
    /// nonce space is exhausted, or a stop is requested. Shares stream
    /// through the returned channel and the observer.
    pub fn mine(
        &mut self,
        job: &MiningJob,
        threads: usize,
        observer: &dyn MiningObserver,
    ) -> Result<Vec<FoundShare>, RandomxError> {
        if job.nonce_offset + 4 > job.hashing_blob.len() {
            return Err(RandomxError::BadJob("nonce offset outside blob"));
        }
        let threads = threads.max(1).min(num_cpus::get().max(1));
        self.stop.store(false, Ordering::Relaxed);
        self.state = SessionState::Hashing;
        observer.on_state(self.state);

        let (share_tx, share_rx) = mpsc::channel::<FoundShare>();
        let stop = Arc::clone(&self.stop);
        let hash_count = Arc::clone(&self.hash_count);

        // Workers need the source; construct per-thread VMs against the
        // shared read-only cache/dataset.
        let mode = self.mode;
        let cache = self.cache.clone().ok_or(RandomxError::NotReady)?;
        let dataset = self.dataset.clone();
        if mode == MiningMode::Full && dataset.is_none() {
            return Err(RandomxError::NotReady);
        }

        std::thread::scope(|scope| {
            for worker in 0..threads {
                let tx = share_tx.clone();
                let stop = Arc::clone(&stop);
                let hash_count = Arc::clone(&hash_count);
                let cache = Arc::clone(&cache);
                let dataset = dataset.clone();
                let job = job.clone();
                scope.spawn(move || {
                    let source = match (&mode, &dataset) {
                        (MiningMode::Full, Some(ds)) => DatasetSource::Full(ds.as_ref()),
                        _ => DatasetSource::Light(cache.as_ref()),
                    };
                    let mut vm = Vm::new(source);
                    let mut blob = job.hashing_blob.clone();
                    // Stride the nonce space across workers.
                    let mut nonce = worker as u32;
                    loop {
                        if stop.load(Ordering::Relaxed) {
                            return;
                        }
                        blob[job.nonce_offset..job.nonce_offset + 4]
                            .copy_from_slice(&nonce.to_le_bytes());
                        let hash = vm.hash(&blob);
                        hash_count.fetch_add(1, Ordering::Relaxed);
                        if hash_meets_difficulty(&hash, job.difficulty) {
                            let _ = tx.send(FoundShare { nonce, hash, height: job.height });
                            stop.store(true, Ordering::Relaxed);
                            return;
                        }
                        match nonce.checked_add(threads as u32) {
                            Some(n) => nonce = n,
                            None => return,
                        }
                    }
                });
            }
            drop(share_tx);
        });

        let shares: Vec<FoundShare> = share_rx.try_iter().collect();
        for share in &shares {
            log::info!(
                "share found at height {}: nonce {:#010x}",
                share.height,
                share.nonce
            );
            observer.on_share_found(share);
        }
        self.state = SessionState::Ready;
        observer.on_state(self.state);
        Ok(shares)
    }
}

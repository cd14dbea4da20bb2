//! Dataset construction.
//!
//! Each 64-byte item mixes the item number through the eight superscalar
//! programs against cache lines addressed by the running register file.
//! Light mode calls `init_item` per access; full mode materializes all
//! ~2080 MiB once, in chunks so callers can report progress and check
//! for cancellation between chunks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::Cache;
use crate::config::{DATASET_ITEM_COUNT, DATASET_ITEM_SIZE};
use crate::superscalar;

const MUL0: u64 = 6364136223846793005;
const ADD1: u64 = 9298411001130361340;
const ADD2: u64 = 12065312585734608966;
const ADD3: u64 = 9306329213124626780;
const ADD4: u64 = 5281919268842080866;
const ADD5: u64 = 10536153434571861004;
const ADD6: u64 = 3398623926847679864;
const ADD7: u64 = 9549104520008361294;

/// Compute dataset item `item_number` into 8 qwords.
pub fn init_item(cache: &Cache, item_number: u64) -> [u64; 8] {
    let mut r = [0u64; 8];
    r[0] = (item_number.wrapping_add(1)).wrapping_mul(MUL0);
    r[1] = r[0] ^ ADD1;
    r[2] = r[0] ^ ADD2;
    r[3] = r[0] ^ ADD3;
    r[4] = r[0] ^ ADD4;
    r[5] = r[0] ^ ADD5;
    r[6] = r[0] ^ ADD6;
    r[7] = r[0] ^ ADD7;

    let mut register_value = item_number;
    for program in cache.programs() {
        superscalar::execute(program, &mut r);
        let line = cache.line(register_value);
        for (reg, qword) in r.iter_mut().zip(line) {
            *reg ^= qword;
        }
        register_value = r[program.address_register];
    }
    r
}

/// Full-mode dataset: a read-only shared buffer of all items.
pub struct Dataset {
    items: Vec<u64>,
}

/// Progress callback: (items_done, items_total).
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Sync + 'a;

impl Dataset {
    /// Item count covered by this dataset.
    pub const ITEM_COUNT: u64 = DATASET_ITEM_COUNT;

    /// Build the full dataset over `threads` workers. `progress` fires
    /// roughly every `chunk` items (clamped to [1024, 65536]); the build
    /// aborts between chunks when `stop` flips.
    pub fn build(
        cache: &Cache,
        threads: usize,
        chunk: usize,
        stop: Option<&AtomicBool>,
        progress: Option<&ProgressFn>,
    ) -> Option<Self> {
        let threads = threads.max(1);
        let chunk = chunk.clamp(1024, 65536) as u64;
        let total = DATASET_ITEM_COUNT;
        let mut items = vec![0u64; (total as usize) * 8];

        log::info!(
            "building RandomX dataset: {} items on {} threads",
            total,
            threads
        );

        let next_chunk = Arc::new(AtomicU64::new(0));
        let done = Arc::new(AtomicU64::new(0));
        let cancelled = AtomicBool::new(false);

        std::thread::scope(|scope| {
            // Hand out disjoint chunks to workers through an atomic
            // cursor; each worker writes its own slice.
            let items_ptr = SendPtr(items.as_mut_ptr());
            for _ in 0..threads {
                let next_chunk = Arc::clone(&next_chunk);
                let done = Arc::clone(&done);
                let cancelled = &cancelled;
                let items_ptr = items_ptr;
                scope.spawn(move || {
                    let items_ptr = items_ptr;
                    loop {
                        if cancelled.load(Ordering::Relaxed)
                            || stop.map(|s| s.load(Ordering::Relaxed)).unwrap_or(false)
                        {
                            cancelled.store(true, Ordering::Relaxed);
                            return;
                        }
                        let start = next_chunk.fetch_add(chunk, Ordering::Relaxed);
                        if start >= total {
                            return;
                        }
                        let end = (start + chunk).min(total);
                        for item in start..end {
                            let qwords = init_item(cache, item);
                            // Disjoint ranges per item: no aliasing.
                            unsafe {
                                let dst = items_ptr.0.add(item as usize * 8);
                                std::ptr::copy_nonoverlapping(qwords.as_ptr(), dst, 8);
                            }
                        }
                        let finished = done.fetch_add(end - start, Ordering::Relaxed) + (end - start);
                        if let Some(cb) = progress {
                            cb(finished, total);
                        }
                    }
                });
            }
        });

        if cancelled.load(Ordering::Relaxed) {
            return None;
        }
        Some(Self { items })
    }

    /// Single-chunk builder for callers that drive progress themselves.
    pub fn build_chunk(cache: &Cache, out: &mut [u64], first_item: u64, count: usize) {
        assert!(out.len() >= count * 8);
        for i in 0..count {
            let qwords = init_item(cache, first_item + i as u64);
            out[i * 8..i * 8 + 8].copy_from_slice(&qwords);
        }
    }

    /// 64-byte item as 8 qwords.
    #[inline]
    pub fn item(&self, item_number: u64) -> &[u64] {
        let idx = (item_number % DATASET_ITEM_COUNT) as usize * 8;
        &self.items[idx..idx + 8]
    }

    pub fn size_bytes(&self) -> usize {
        self.items.len() * 8
    }
}

/// Raw pointer wrapper so worker threads can write disjoint slices.
#[derive(Clone, Copy)]
struct SendPtr(*mut u64);
unsafe impl Send for SendPtr {}
unsafe impl Sync for SendPtr {}

/// Either access mode behind one call.
pub enum DatasetSource<'a> {
    Light(&'a Cache),
    Full(&'a Dataset),
}

impl DatasetSource<'_> {
    #[inline]
    pub fn read(&self, item_number: u64) -> [u64; 8] {
        match self {
            DatasetSource::Light(cache) => init_item(cache, item_number),
            DatasetSource::Full(ds) => {
                let mut out = [0u64; 8];
                out.copy_from_slice(ds.item(item_number));
                out
            }
        }
    }
}

/// Size of one dataset item in bytes, re-exported for callers sizing
/// their own chunk buffers.
pub const ITEM_BYTES: usize = DATASET_ITEM_SIZE;

#[cfg(test)]
mod tests {
    // Dataset math over a real cache is exercised by the ignored
    // end-to-end tests in tests/reference_vectors.rs; the item-mixing
    // constants are covered there too.

    #[test]
    fn item_constants_are_distinct() {
        let consts = [
            super::ADD1, super::ADD2, super::ADD3, super::ADD4, super::ADD5, super::ADD6,
            super::ADD7,
        ];
        for i in 0..consts.len() {
            for j in i + 1..consts.len() {
                assert_ne!(consts[i], consts[j]);
            }
        }
    }
}

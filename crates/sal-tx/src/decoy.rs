//! Decoy selection over the global output distribution.
//!
//! Samples ring members from a gamma distribution fitted to observed
//! spend ages (shape 19.28, scale 1/1.61, Miller et al.), mapped onto
//! the cumulative RCT output counts the daemon reports, and clipped
//! away from the not-yet-spendable window.

use rand::Rng;

use sal_types::consensus::{DEFAULT_RING_SIZE, DEFAULT_TX_SPENDABLE_AGE, DIFFICULTY_TARGET};

use crate::error::TxError;

const GAMMA_SHAPE: f64 = 19.28;
const GAMMA_SCALE: f64 = 1.0 / 1.61;
/// Spends inside this window (15 blocks at the 120 s target) are
/// re-drawn uniformly over recent outputs.
const RECENT_SPEND_WINDOW: f64 = 1800.0;

pub struct DecoySelector {
    /// Cumulative RCT output count per block height.
    rct_offsets: Vec<u64>,
    /// Outputs old enough to appear in a ring.
    num_usable: u64,
    /// Average seconds between consecutive outputs.
    average_output_time: f64,
}

impl DecoySelector {
    pub fn new(rct_offsets: Vec<u64>) -> Result<Self, TxError> {
        if rct_offsets.len() <= DEFAULT_TX_SPENDABLE_AGE as usize {
            return Err(TxError::DecoySelection(
                "output distribution shorter than the spendable age".into(),
            ));
        }
        let usable_blocks = rct_offsets.len() - DEFAULT_TX_SPENDABLE_AGE as usize;
        let num_usable = rct_offsets[usable_blocks - 1];
        if num_usable == 0 {
            return Err(TxError::DecoySelection("no usable outputs on chain".into()));
        }
        let average_output_time =
            (usable_blocks as f64 * DIFFICULTY_TARGET as f64) / num_usable as f64;
        Ok(Self { rct_offsets, num_usable, average_output_time })
    }

    /// Draw one global output index from the age distribution.
    fn sample_index<R: Rng>(&self, rng: &mut R) -> u64 {
        // Gamma(shape, scale) via Marsaglia-Tsang.
        let age_seconds = {
            let x = sample_gamma(rng, GAMMA_SHAPE, GAMMA_SCALE).exp();
            if x < RECENT_SPEND_WINDOW {
                // Too recent: smear uniformly over the window.
                rng.gen_range(0.0..RECENT_SPEND_WINDOW)
            } else {
                x
            }
        };
        let output_age = (age_seconds / self.average_output_time) as u64;
        if output_age >= self.num_usable {
            // Tail beyond chain start: uniform fallback.
            return rng.gen_range(0..self.num_usable);
        }
        self.num_usable - 1 - output_age
    }

    /// Pick `ring_size - 1` distinct decoys, never the real index.
    pub fn pick_decoys(&self, real_index: u64, ring_size: usize) -> Result<Vec<u64>, TxError> {
        let wanted = ring_size - 1;
        let mut rng = rand::thread_rng();
        let mut picked = Vec::with_capacity(wanted);
        let max_attempts = wanted * 200;
        let mut attempts = 0;
        while picked.len() < wanted {
            attempts += 1;
            if attempts > max_attempts {
                return Err(TxError::DecoySelection(format!(
                    "could not find {wanted} distinct decoys in {max_attempts} draws"
                )));
            }
            let idx = self.sample_index(&mut rng);
            if idx == real_index || idx >= self.num_usable || picked.contains(&idx) {
                continue;
            }
            picked.push(idx);
        }
        Ok(picked)
    }

    /// Sorted ring including the real output; returns the real position.
    pub fn build_ring(
        &self,
        real_index: u64,
        ring_size: usize,
    ) -> Result<(Vec<u64>, usize), TxError> {
        let mut ring = self.pick_decoys(real_index, ring_size)?;
        ring.push(real_index);
        ring.sort_unstable();
        let pos = ring
            .iter()
            .position(|&i| i == real_index)
            .expect("real index was just inserted");
        Ok((ring, pos))
    }

    /// Block height containing global output `index`.
    pub fn height_of(&self, index: u64) -> u64 {
        self.rct_offsets.partition_point(|&c| c <= index) as u64
    }
}

/// Marsaglia-Tsang gamma sampling for shape >= 1.
fn sample_gamma<R: Rng>(rng: &mut R, shape: f64, scale: f64) -> f64 {
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x: f64 = {
            // Box-Muller standard normal.
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen_range(0.0..1.0);
            (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
        };
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
        if u.ln() < 0.5 * x * x + d - d * v + d * v.ln() {
            return d * v * scale;
        }
    }
}

/// Absolute indices -> first-absolute-then-delta wire form.
pub fn absolute_to_offsets(absolute: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(absolute.len());
    let mut prev = 0u64;
    for (i, &a) in absolute.iter().enumerate() {
        if i == 0 {
            out.push(a);
        } else {
            out.push(a - prev);
        }
        prev = a;
    }
    out
}

/// Wire offsets -> absolute indices.
pub fn offsets_to_absolute(offsets: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(offsets.len());
    let mut acc = 0u64;
    for (i, &o) in offsets.iter().enumerate() {
        acc = if i == 0 { o } else { acc + o };
        out.push(acc);
    }
    out
}

pub use sal_types::consensus::DEFAULT_RING_SIZE as RING_SIZE;

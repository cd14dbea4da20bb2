//! Transaction weight estimation and fee computation.
//!
//! Weight is the serialized size plus the Bulletproofs+ clawback that
//! charges padded aggregated proofs for the space they would have used
//! uncompressed. Fees are per-byte, scaled by priority, rounded up to
//! the quantization unit; conversions burn an extra 1/32 slippage floor.

use sal_types::consensus::{
    base_fee, conversion_slippage, quantize_fee, FeePriority, DEFAULT_RING_SIZE,
};
use sal_types::txout_tag;

/// Serialized size of one BP+ proof aggregating `padded` outputs
/// (padded to a power of two): 6 fixed keys + 2 varints + 2*log(64*M).
fn bpp_proof_size(padded: usize) -> usize {
    let lr = 6 + log2(padded);
    6 * 32 + 2 + 2 * lr * 32
}

fn log2(mut v: usize) -> usize {
    let mut l = 0;
    while v > 1 {
        v >>= 1;
        l += 1;
    }
    l
}

fn next_pow2(m: usize) -> usize {
    let mut v = 1;
    while v < m {
        v <<= 1;
    }
    v
}

/// Estimated serialized size of a current-consensus transaction.
pub fn estimate_tx_size(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_tag: u8,
) -> usize {
    let mut size = 0usize;

    // Prefix scalars: version, unlock, vector counts.
    size += 1 + 1 + 1 + 1;
    // Salvium suffix: tx_type + amount_burnt + return list/mask + asset
    // strings + slippage.
    size += 1 + 9 + 2 + num_inputs * 32 + 2 + 5 + 5 + 9;

    // Inputs: tag + amount + asset + offsets + key image.
    size += num_inputs * (1 + 1 + 5 + 1 + ring_size * 3 + 32);

    // Outputs.
    let per_output = match out_tag {
        txout_tag::CARROT_V1 => 1 + 1 + 32 + 5 + 3 + 16,
        txout_tag::TAGGED_KEY => 1 + 1 + 32 + 5 + 1 + 1,
        _ => 1 + 1 + 32 + 5 + 1,
    };
    size += num_outputs * per_output;

    // Extra: ephemeral pubkeys + encrypted payment id nonce.
    size += 2 + 33.max(2 + num_outputs * 32) + 11;

    // RCT base: type + fee + ecdh + outPk + p_r.
    size += 1 + 5 + num_outputs * 8 + num_outputs * 32 + 32;

    // Prunable: BP+ (count varint + proof), ring sigs, pseudo-outs.
    size += 1 + bpp_proof_size(next_pow2(num_outputs));
    let sig_size = if use_tclsag {
        ring_size * 64 + 64
    } else {
        ring_size * 32 + 64
    };
    size += num_inputs * (sig_size + 32);

    size
}

/// Weight: size plus the BP+ clawback above 2 outputs.
pub fn estimate_tx_weight(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_tag: u8,
) -> usize {
    let size = estimate_tx_size(num_inputs, num_outputs, ring_size, use_tclsag, out_tag);
    if num_outputs <= 2 {
        return size;
    }
    // Padded proof bytes minus what a linear proof would cost, 80%
    // charged back.
    let padded = next_pow2(num_outputs);
    let bpp = bpp_proof_size(padded);
    let linear = (bpp * padded) / 2;
    size + (linear.saturating_sub(bpp)) * 4 / 5
}

/// Fee for a transaction of the given shape.
pub fn compute_fee(
    num_inputs: usize,
    num_outputs: usize,
    ring_size: usize,
    use_tclsag: bool,
    out_tag: u8,
    priority: FeePriority,
) -> u64 {
    let weight = estimate_tx_weight(num_inputs, num_outputs, ring_size, use_tclsag, out_tag) as u64;
    quantize_fee(base_fee(weight).saturating_mul(priority.multiplier()))
}

/// Minimum `amount_slippage_limit` for a conversion burning
/// `amount_burnt`: the fixed 1/32 floor.
pub fn minimum_slippage(amount_burnt: u64) -> u64 {
    conversion_slippage(amount_burnt)
}

/// Convenience for the common 2-output transfer.
pub fn default_transfer_fee(num_inputs: usize, use_tclsag: bool, priority: FeePriority) -> u64 {
    compute_fee(
        num_inputs,
        2,
        DEFAULT_RING_SIZE,
        use_tclsag,
        txout_tag::CARROT_V1,
        priority,
    )
}

//! Consensus parameters the wallet needs: spendable-age windows, fee
//! rules, and the slippage floor for oracle conversions.
//!
//! Reference: salvium/src/cryptonote_config.h.

/// Target seconds between blocks.
pub const DIFFICULTY_TARGET: u64 = 120;

/// Blocks a coinbase output stays locked.
pub const MINED_MONEY_UNLOCK_WINDOW: u64 = 60;

/// Blocks before a freshly received output may be spent.
pub const DEFAULT_TX_SPENDABLE_AGE: u64 = 10;

/// Ring size used by current-consensus transactions (15 decoys + real).
pub const DEFAULT_RING_SIZE: usize = 16;

/// Maximum outputs a single Bulletproof+ may aggregate.
pub const BULLETPROOF_MAX_OUTPUTS: usize = 16;

/// Maximum serialized tx_extra size accepted by relay rules.
pub const MAX_TX_EXTRA_SIZE: usize = 1060;

/// Per-byte fee in atomic units.
pub const FEE_PER_BYTE: u64 = 30;

/// Fees are rounded up to a multiple of this.
pub const FEE_QUANTIZATION_MASK: u64 = 10_000;

/// Denominator of the fixed conversion slippage: burn side pays 1/32.
pub const SLIPPAGE_DIVISOR: u64 = 32;

/// Fee priority levels exposed by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePriority {
    Low,
    Normal,
    High,
    Highest,
}

impl FeePriority {
    /// Multiplier applied to the per-byte base fee.
    pub fn multiplier(&self) -> u64 {
        match self {
            FeePriority::Low => 1,
            FeePriority::Normal => 5,
            FeePriority::High => 25,
            FeePriority::Highest => 1000,
        }
    }
}

/// Base fee for a transaction of `weight` bytes, before priority scaling
/// and quantization.
pub fn base_fee(weight: u64) -> u64 {
    weight.saturating_mul(FEE_PER_BYTE)
}

/// Round a fee up to the quantization unit.
pub fn quantize_fee(fee: u64) -> u64 {
    fee.div_ceil(FEE_QUANTIZATION_MASK) * FEE_QUANTIZATION_MASK
}

/// Minimum slippage withheld from the burnt side of a conversion.
pub fn conversion_slippage(amount_burnt: u64) -> u64 {
    amount_burnt / SLIPPAGE_DIVISOR
}

/// Whether an output received at `unlock_time` (height or timestamp
/// convention) is spendable at `chain_height`.
pub fn is_unlocked(unlock_time: u64, received_height: u64, chain_height: u64) -> bool {
    // Values below this threshold are block heights, above are unix times.
    const UNLOCK_TIME_IS_TIMESTAMP: u64 = 500_000_000;
    if unlock_time == 0 {
        return chain_height >= received_height + DEFAULT_TX_SPENDABLE_AGE;
    }
    if unlock_time < UNLOCK_TIME_IS_TIMESTAMP {
        chain_height >= unlock_time
    } else {
        // Timestamp locks are approximated by the chain tip's expected time.
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        now >= unlock_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_quantization_rounds_up() {
        assert_eq!(quantize_fee(1), FEE_QUANTIZATION_MASK);
        assert_eq!(quantize_fee(FEE_QUANTIZATION_MASK), FEE_QUANTIZATION_MASK);
        assert_eq!(quantize_fee(FEE_QUANTIZATION_MASK + 1), 2 * FEE_QUANTIZATION_MASK);
        assert_eq!(quantize_fee(0), 0);
    }

    #[test]
    fn slippage_is_one_thirty_second() {
        assert_eq!(conversion_slippage(32), 1);
        assert_eq!(conversion_slippage(64_000), 2_000);
        assert_eq!(conversion_slippage(31), 0);
    }

    #[test]
    fn spendable_age_applies_without_unlock_time() {
        assert!(!is_unlocked(0, 100, 105));
        assert!(is_unlocked(0, 100, 110));
    }

    #[test]
    fn height_locks_compare_against_chain_height() {
        assert!(!is_unlocked(200, 100, 199));
        assert!(is_unlocked(200, 100, 200));
    }
}

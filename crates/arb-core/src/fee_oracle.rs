//! Per-pool learned fees (spec §4.5): infers a constant-product pool's
//! effective fee, per direction, from observed confirmed swaps, so
//! simulation does not need an extra RPC round-trip per pool.

use std::collections::HashMap;

use arb_types::{Direction, Key, DEFAULT_FEE_BPS, FEE_ORACLE_MAX_BPS, FEE_ORACLE_MIN_BPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeOracleEntry {
    pub fee_bps: u64,
    pub slot: u64,
    pub observation_count: u64,
    pub last_seen_unix_ms: u64,
}

#[derive(Debug)]
pub struct FeeOracle {
    entries: HashMap<(Key, Direction), FeeOracleEntry>,
    default_fee_bps: u64,
}

impl Default for FeeOracle {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_BPS)
    }
}

impl FeeOracle {
    pub fn new(default_fee_bps: u64) -> Self {
        Self {
            entries: HashMap::new(),
            default_fee_bps,
        }
    }

    /// Infers `f_bps` from `(pre_reserve_in, pre_reserve_out, amount_in,
    /// actual_out)` and records it if it falls within the sanity window.
    /// Returns `true` if the observation was accepted.
    pub fn learn_fee(
        &mut self,
        pool: Key,
        direction: Direction,
        pre_reserve_in: u128,
        pre_reserve_out: u128,
        amount_in: u128,
        actual_out: u128,
        slot: u64,
        now_unix_ms: u64,
    ) -> bool {
        let inferred = match arb_math::cpmm::infer_fee_bps(amount_in, actual_out, pre_reserve_in, pre_reserve_out) {
            Ok(v) => v,
            Err(_) => return false,
        };
        if inferred < FEE_ORACLE_MIN_BPS as i128 || inferred > FEE_ORACLE_MAX_BPS as i128 {
            return false;
        }
        let fee_bps = inferred as u64;
        let key = (pool, direction);
        let observation_count = self.entries.get(&key).map(|e| e.observation_count + 1).unwrap_or(1);
        self.entries.insert(
            key,
            FeeOracleEntry {
                fee_bps,
                slot,
                observation_count,
                last_seen_unix_ms: now_unix_ms,
            },
        );
        true
    }

    /// The learned fee for `(pool, direction)`, or the configured default
    /// when nothing has been learned yet.
    pub fn fee(&self, pool: Key, direction: Direction) -> u64 {
        self.entries
            .get(&(pool, direction))
            .map(|e| e.fee_bps)
            .unwrap_or(self.default_fee_bps)
    }

    pub fn entry(&self, pool: Key, direction: Direction) -> Option<&FeeOracleEntry> {
        self.entries.get(&(pool, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_falls_back_to_default_when_nothing_learned() {
        let oracle = FeeOracle::new(30);
        assert_eq!(oracle.fee(Key::new([1; 32]), Direction::AToB), 30);
    }

    #[test]
    fn learn_fee_recovers_the_exact_fee_used_to_produce_the_output() {
        let mut oracle = FeeOracle::new(30);
        let pool = Key::new([1; 32]);
        let fee_hundred_thousandths = arb_math::cpmm::bps_to_hundred_thousandths(25);
        let out = arb_math::cpmm::quote_exact_input(
            10_000_000,
            1_000_000_000,
            2_000_000_000,
            fee_hundred_thousandths,
        )
        .unwrap();
        let accepted = oracle.learn_fee(
            pool,
            Direction::AToB,
            1_000_000_000,
            2_000_000_000,
            10_000_000,
            out,
            100,
            0,
        );
        assert!(accepted);
        assert_eq!(oracle.fee(pool, Direction::AToB), 25);
    }

    #[test]
    fn out_of_window_fee_is_rejected_and_does_not_overwrite() {
        let mut oracle = FeeOracle::new(30);
        let pool = Key::new([1; 32]);
        // An output far above the no-fee quote implies a negative/absurd fee.
        let accepted = oracle.learn_fee(pool, Direction::AToB, 1_000, 1_000, 500, 999, 1, 0);
        assert!(!accepted);
        assert_eq!(oracle.fee(pool, Direction::AToB), 30);
    }
}

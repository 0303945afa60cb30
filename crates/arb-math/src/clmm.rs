//! Concentrated-liquidity delta math: token amounts swept between two
//! Q64.64 sqrt-prices at constant liquidity, and the inverse (given an
//! input amount, the sqrt-price it moves to). Shared building blocks for
//! the tick-walking simulator in `arb-core`.

use crate::big_int::{mul_div_u128, Rounding};
use crate::error::MathResult;
use crate::tick_math::{reciprocal_q64, Q64};

fn ordered(a: u128, b: u128) -> (u128, u128) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Amount of token0 (base) swept moving between `sqrt_a` and `sqrt_b` at
/// constant `liquidity`: `L * (1/sqrtLo - 1/sqrtHi)`.
pub fn amount0_delta(liquidity: u128, sqrt_a: u128, sqrt_b: u128, round_up: bool) -> MathResult<u128> {
    let (lo, hi) = ordered(sqrt_a, sqrt_b);
    let recip_lo = reciprocal_q64(lo.max(1))?;
    let recip_hi = reciprocal_q64(hi.max(1))?;
    let diff = recip_lo.saturating_sub(recip_hi);
    mul_div_u128(liquidity, diff, Q64, if round_up { Rounding::Up } else { Rounding::Down })
}

/// Amount of token1 (quote) swept moving between `sqrt_a` and `sqrt_b` at
/// constant `liquidity`: `L * (sqrtHi - sqrtLo)`.
pub fn amount1_delta(liquidity: u128, sqrt_a: u128, sqrt_b: u128, round_up: bool) -> MathResult<u128> {
    let (lo, hi) = ordered(sqrt_a, sqrt_b);
    let diff = hi - lo;
    mul_div_u128(liquidity, diff, Q64, if round_up { Rounding::Up } else { Rounding::Down })
}

/// Next sqrt-price after adding `amount_in` of token0 to the pool (price
/// moves down): `sqrtQ = L * sqrtP / (L + amount_in * sqrtP / Q64)`.
pub fn next_sqrt_price_from_amount0_in(sqrt_p: u128, liquidity: u128, amount_in: u128) -> MathResult<u128> {
    let term = mul_div_u128(amount_in, sqrt_p, Q64, Rounding::Down)?;
    let denominator = liquidity.checked_add(term).ok_or(crate::error::MathError::Overflow)?;
    mul_div_u128(liquidity, sqrt_p, denominator, Rounding::Up)
}

/// Next sqrt-price after adding `amount_in` of token1 to the pool (price
/// moves up): `sqrtQ = sqrtP + amount_in * Q64 / L`.
pub fn next_sqrt_price_from_amount1_in(sqrt_p: u128, liquidity: u128, amount_in: u128) -> MathResult<u128> {
    let delta = mul_div_u128(amount_in, Q64, liquidity, Rounding::Down)?;
    sqrt_p.checked_add(delta).ok_or(crate::error::MathError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick_math::sqrt_price_at_tick;

    #[test]
    fn amount_deltas_are_zero_over_an_empty_range() {
        let p = sqrt_price_at_tick(0).unwrap();
        assert_eq!(amount0_delta(1_000_000, p, p, false).unwrap(), 0);
        assert_eq!(amount1_delta(1_000_000, p, p, false).unwrap(), 0);
    }

    #[test]
    fn amount1_delta_grows_with_liquidity() {
        let a = sqrt_price_at_tick(0).unwrap();
        let b = sqrt_price_at_tick(1_000).unwrap();
        let small = amount1_delta(1_000_000, a, b, false).unwrap();
        let large = amount1_delta(2_000_000, a, b, false).unwrap();
        assert!(large > small);
    }

    #[test]
    fn next_sqrt_price_from_amount1_in_increases_price() {
        let p = sqrt_price_at_tick(0).unwrap();
        let next = next_sqrt_price_from_amount1_in(p, 1_000_000_000, 1_000_000).unwrap();
        assert!(next > p);
    }

    #[test]
    fn next_sqrt_price_from_amount0_in_decreases_price() {
        let p = sqrt_price_at_tick(0).unwrap();
        let next = next_sqrt_price_from_amount0_in(p, 1_000_000_000, 1_000_000).unwrap();
        assert!(next < p);
    }

    #[test]
    fn round_trip_amount1_then_recover_via_next_price() {
        let a = sqrt_price_at_tick(100).unwrap();
        let b = sqrt_price_at_tick(200).unwrap();
        let liquidity = 5_000_000_000u128;
        let needed = amount1_delta(liquidity, a, b, true).unwrap();
        let reached = next_sqrt_price_from_amount1_in(a, liquidity, needed).unwrap();
        // Rounding up the required amount must reach at least the target.
        assert!(reached >= b);
    }
}

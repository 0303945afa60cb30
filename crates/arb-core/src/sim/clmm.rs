//! Concentrated-liquidity simulator (spec §4.7): walks the active tick
//! range step by step, crossing initialised ticks in the swap direction
//! until the input is exhausted, a caller-supplied √P limit is reached, or
//! liquidity would drop to zero.

use arb_math::tick_math::{MAX_SQRT_PRICE_X64, MIN_SQRT_PRICE_X64};
use arb_math::{clmm as clmm_math, tick_math};
use arb_types::{Direction, Key, TICKS_PER_ARRAY};

use crate::cache::tick::{TickCache, TickLookup};
use crate::entities::{ClmmState, Tick};

use super::{Confidence, SimError, SimOutcome, SimResult};

/// Caps the number of tick-crossing steps a single swap may take. Spec
/// does not name a bound; this guards against a pathological bitmap
/// (thousands of one-unit-apart initialised ticks) turning one simulation
/// into an unbounded loop on the hot path.
const MAX_STEPS: usize = 256;

/// `Direction::BToA` spends the quote token, so price (quote per base)
/// rises; `AToB` spends base, so price falls.
fn ascending(direction: Direction) -> bool {
    matches!(direction, Direction::BToA)
}

pub fn simulate_swap(
    ticks: &mut TickCache,
    pool: Key,
    state: &ClmmState,
    amount_in: u128,
    direction: Direction,
    fee_bps: u64,
    sqrt_price_limit_x64: Option<u128>,
) -> SimOutcome {
    if amount_in == 0 {
        return Ok(SimResult {
            amount_out: 0,
            fee_paid: 0,
            impact_bps: 0,
            confidence: Confidence::Full,
        });
    }

    let up = ascending(direction);
    let array_span = ((state.tick_spacing as i32) * (TICKS_PER_ARRAY as i32)).max(1);
    let initial_sqrt_price = state.sqrt_price_x64;
    let limit = sqrt_price_limit_x64.unwrap_or(if up { MAX_SQRT_PRICE_X64 } else { MIN_SQRT_PRICE_X64 });

    let mut sqrt_price = state.sqrt_price_x64;
    let mut liquidity = state.liquidity;
    let mut current_tick = state.current_tick;
    let mut remaining = amount_in;
    let mut amount_out: u128 = 0;
    let mut fee_paid: u128 = 0;
    let mut confidence = Confidence::Full;

    for _ in 0..MAX_STEPS {
        if remaining == 0 {
            break;
        }

        let next_tick = find_next_initialized_tick(ticks, pool, state, current_tick, array_span, up, &mut confidence);
        let boundary_sqrt_price = match next_tick {
            Some((tick, _net)) => tick_math::sqrt_price_at_tick(tick).unwrap_or(limit),
            None => limit,
        };
        let step_target = if up {
            boundary_sqrt_price.min(limit)
        } else {
            boundary_sqrt_price.max(limit)
        };

        if liquidity == 0 {
            match next_tick {
                Some((tick, net)) => {
                    // No liquidity to trade in this gap: cross for free.
                    current_tick = tick;
                    sqrt_price = step_target;
                    liquidity = cross_tick(liquidity, net, up);
                    continue;
                }
                None => break,
            }
        }

        let (needed_in, full_step_out) = match direction {
            Direction::AToB => {
                let needed = clmm_math::amount0_delta(liquidity, sqrt_price, step_target, true)
                    .map_err(|_| SimError::InsufficientLiquidity)?;
                let out = clmm_math::amount1_delta(liquidity, sqrt_price, step_target, false)
                    .map_err(|_| SimError::InsufficientLiquidity)?;
                (needed, out)
            }
            Direction::BToA => {
                let needed = clmm_math::amount1_delta(liquidity, sqrt_price, step_target, true)
                    .map_err(|_| SimError::InsufficientLiquidity)?;
                let out = clmm_math::amount0_delta(liquidity, sqrt_price, step_target, false)
                    .map_err(|_| SimError::InsufficientLiquidity)?;
                (needed, out)
            }
        };

        let full_step_cost = gross_for_net(needed_in, fee_bps);
        let fee_for_full_step = full_step_cost.saturating_sub(needed_in);

        if next_tick.is_some() && remaining >= full_step_cost && full_step_cost > 0 {
            remaining -= full_step_cost;
            fee_paid += fee_for_full_step;
            amount_out += full_step_out;
            sqrt_price = step_target;
            let (tick, net) = next_tick.unwrap();
            // Tie-break (spec §4.7): landing exactly on the tick boundary
            // counts as "just consumed, do not cross" — the next iteration
            // re-discovers this same tick and crosses it only if further
            // input remains.
            current_tick = tick;
            liquidity = cross_tick(liquidity, net, up);
        } else {
            // Partial step: consume whatever is left within this range.
            let after_fee = floor_after_fee(remaining, fee_bps);
            let new_sqrt_price = match direction {
                Direction::AToB => clmm_math::next_sqrt_price_from_amount0_in(sqrt_price, liquidity, after_fee),
                Direction::BToA => clmm_math::next_sqrt_price_from_amount1_in(sqrt_price, liquidity, after_fee),
            }
            .map_err(|_| SimError::InsufficientLiquidity)?;
            let clamped = if up {
                new_sqrt_price.min(step_target)
            } else {
                new_sqrt_price.max(step_target)
            };
            let out = match direction {
                Direction::AToB => clmm_math::amount1_delta(liquidity, sqrt_price, clamped, false),
                Direction::BToA => clmm_math::amount0_delta(liquidity, sqrt_price, clamped, false),
            }
            .map_err(|_| SimError::InsufficientLiquidity)?;
            amount_out += out;
            fee_paid += remaining - after_fee;
            sqrt_price = clamped;
            remaining = 0;
        }
    }

    if amount_out == 0 && remaining == amount_in {
        return Err(SimError::InsufficientLiquidity);
    }
    if remaining > 0 && fee_paid + amount_out == 0 {
        return Err(SimError::InsufficientLiquidity);
    }

    let impact_bps = price_impact_bps(initial_sqrt_price, sqrt_price);
    Ok(SimResult {
        amount_out,
        fee_paid,
        impact_bps,
        confidence,
    })
}

fn cross_tick(liquidity: u128, net: i128, up: bool) -> u128 {
    // Crossing ascending applies the tick's net delta as stored; crossing
    // descending applies its negation (spec §4.7, step 4).
    let signed_net = if up { net } else { -net };
    let updated = liquidity as i128 + signed_net;
    updated.max(0) as u128
}

fn floor_after_fee(amount: u128, fee_bps: u64) -> u128 {
    let fee = (amount.saturating_mul(fee_bps as u128)) / 10_000;
    amount.saturating_sub(fee)
}

/// Gross input required so that, after `fee_bps` is deducted, exactly
/// `net` reaches the pool — the exact inverse of `floor_after_fee`
/// (`net = gross * (1 - fee)`, so `gross = net / (1 - fee)`), rounded up
/// so the pool is never short-changed.
fn gross_for_net(net: u128, fee_bps: u64) -> u128 {
    if net == 0 {
        return 0;
    }
    if fee_bps as u128 >= 10_000 {
        return u128::MAX;
    }
    arb_math::big_int::mul_div_u128(net, 10_000, 10_000 - fee_bps as u128, arb_math::big_int::Rounding::Up)
        .unwrap_or(u128::MAX)
}

/// Natural-log price impact in basis points (spec §4.7: "Price-impact is
/// the log-ratio of final to initial √P in basis points").
fn price_impact_bps(initial_sqrt_price: u128, final_sqrt_price: u128) -> u64 {
    if initial_sqrt_price == 0 || final_sqrt_price == 0 {
        return 0;
    }
    let ratio = final_sqrt_price as f64 / initial_sqrt_price as f64;
    let bps = (ratio.ln().abs() * 10_000.0).round();
    if bps.is_finite() {
        bps.max(0.0) as u64
    } else {
        0
    }
}

/// Finds the next initialised tick strictly beyond `from_tick` in the
/// requested direction, walking tick arrays via `get_or_virtual` and using
/// the pool's occupancy bitmap to skip to the next array that might hold
/// one. Returns `None` either because no further initialised tick exists
/// within the bitmap's range, or because the tick cache could not supply a
/// required array — in the latter case `confidence` is downgraded to
/// `ReducedSingleTick` (spec §4.7, "Single-tick fallback").
fn find_next_initialized_tick(
    ticks: &mut TickCache,
    pool: Key,
    state: &ClmmState,
    from_tick: i32,
    array_span: i32,
    up: bool,
    confidence: &mut Confidence,
) -> Option<(i32, i128)> {
    let spacing = state.tick_spacing.max(1) as i32;
    let mut array_start = from_tick.div_euclid(array_span) * array_span;
    let mut from_idx = (from_tick - array_start) / spacing;

    loop {
        let array_index = array_start.div_euclid(array_span);
        let found = match ticks.get_or_virtual(pool, array_start) {
            TickLookup::Cached(entry) => scan_array(&entry.ticks, from_idx, array_start, spacing, up),
            TickLookup::Virtual(virtual_ticks) => scan_array(&virtual_ticks, from_idx, array_start, spacing, up),
            TickLookup::Missing => {
                *confidence = Confidence::ReducedSingleTick;
                return None;
            }
        };
        if found.is_some() {
            return found;
        }

        let next_array_index = state.occupancy.next_set(array_index, up);
        match next_array_index {
            Some(idx) => {
                array_start = idx * array_span;
                from_idx = if up { -1 } else { TICKS_PER_ARRAY as i32 };
            }
            None => return None,
        }
    }
}

fn scan_array(ticks: &[Tick], from_idx: i32, array_start: i32, spacing: i32, up: bool) -> Option<(i32, i128)> {
    let len = ticks.len() as i32;
    if up {
        ((from_idx + 1).max(0)..len)
            .find(|&i| ticks[i as usize].is_initialized())
            .map(|i| (array_start + i * spacing, ticks[i as usize].liquidity_net))
    } else {
        (0..from_idx.min(len)).rev().find(|&i| ticks[i as usize].is_initialized()).map(|i| {
            (array_start + i * spacing, ticks[i as usize].liquidity_net)
        })
    }
}

#[cfg(test)]
mod tests {
    use arb_types::Source;

    use super::*;
    use crate::bitmap::Bitmap1024;
    use crate::entities::TickArrayEntry;

    fn flat_pool(liquidity: u128) -> ClmmState {
        ClmmState {
            tick_spacing: 8,
            current_tick: 0,
            sqrt_price_x64: tick_math::sqrt_price_at_tick(0).unwrap(),
            liquidity,
            occupancy: Bitmap1024::zero(),
            fee_config: Key::new([9; 32]),
        }
    }

    #[test]
    fn zero_bitmap_and_zero_liquidity_is_insufficient_liquidity_scenario_s6() {
        let mut ticks = TickCache::new();
        let pool = Key::new([1; 32]);
        let state = flat_pool(0);
        let result = simulate_swap(&mut ticks, pool, &state, 1_000, Direction::AToB, 30, None);
        assert_eq!(result, Err(SimError::InsufficientLiquidity));
    }

    #[test]
    fn swap_within_a_single_flat_range_produces_output() {
        let mut ticks = TickCache::new();
        let pool = Key::new([1; 32]);
        let state = flat_pool(1_000_000_000_000);
        let result = simulate_swap(&mut ticks, pool, &state, 1_000_000, Direction::AToB, 30, None).unwrap();
        assert!(result.amount_out > 0);
        assert_eq!(result.confidence, Confidence::Full);
    }

    #[test]
    fn missing_tick_array_degrades_confidence_but_still_quotes() {
        let mut ticks = TickCache::new();
        let pool = Key::new([1; 32]);
        let mut bitmap = Bitmap1024::zero();
        bitmap.set(1);
        let state = ClmmState {
            occupancy: bitmap,
            ..flat_pool(1_000_000_000_000)
        };
        // Array at index 1 is neither cached nor confirmed non-existent.
        let result = simulate_swap(&mut ticks, pool, &state, 1_000_000, Direction::BToA, 30, None).unwrap();
        assert_eq!(result.confidence, Confidence::ReducedSingleTick);
        assert!(result.amount_out > 0);
    }

    #[test]
    fn gross_for_net_is_the_exact_inverse_of_floor_after_fee() {
        // A full-step's gross cost and a partial-step's after-fee amount
        // must agree on what "net reaches the pool" means at the same
        // fee rate, or a swap that happens to land exactly on a tick
        // boundary would be billed differently than one that doesn't.
        for fee_bps in [0u64, 1, 30, 1_000, 9_999] {
            let net = 1_000_000u128;
            let gross = gross_for_net(net, fee_bps);
            assert_eq!(floor_after_fee(gross, fee_bps), net, "fee_bps={fee_bps}");
        }
    }

    #[test]
    fn crossing_a_tick_applies_its_net_liquidity_delta() {
        let mut ticks = TickCache::new();
        let pool = Key::new([1; 32]);
        let spacing = 8i32;
        let array_span = spacing * (TICKS_PER_ARRAY as i32);
        let mut tick_vec = vec![Tick::default(); TICKS_PER_ARRAY];
        // One initialised tick just above the current tick, removing all
        // liquidity when crossed ascending.
        tick_vec[1] = Tick {
            liquidity_net: -500_000_000,
            liquidity_gross: 500_000_000,
        };
        ticks.set(TickArrayEntry {
            pool,
            start_tick: 0,
            account_key: Key::new([2; 32]),
            ticks: tick_vec,
            slot: 1,
            write_sequence: 0,
            source: Source::Gossip,
        });
        let mut bitmap = Bitmap1024::zero();
        bitmap.set(0);
        let state = ClmmState {
            liquidity: 500_000_000,
            occupancy: bitmap,
            ..flat_pool(500_000_000)
        };
        let result = simulate_swap(&mut ticks, pool, &state, 10_000_000_000, Direction::BToA, 0, None).unwrap();
        // Liquidity is fully removed once the tick is crossed, so the walk
        // halts there rather than producing an unbounded amount_out.
        assert!(result.amount_out > 0);
    }
}

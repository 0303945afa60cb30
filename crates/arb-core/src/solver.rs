//! Arbitrage solver (spec §4.9): given two pools on the same token pair,
//! finds the input that maximises `out_B(in_A->mid) - in` by binary search
//! with a gradient probe to pick bracket direction, with a closed-form
//! constant-product shortcut used as an initial guess when both legs are
//! constant-product pools.

use arb_types::{ARB_SOLVER_GRADIENT_PROBE_BPS, ARB_SOLVER_MAX_ITERATIONS};

use crate::sim::{SimError, SimOutcome};

/// Reserves/fee shape needed for the closed-form shortcut (spec §4.9:
/// "Short-circuits when both pools are constant-product"). `None` for any
/// other venue family — the solver falls back to a plain midpoint seed.
#[derive(Debug, Clone, Copy)]
pub struct CpmmShortcutLeg {
    pub reserve_in: u128,
    pub reserve_out: u128,
    pub fee_bps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbSolution {
    pub optimal_input: u128,
    pub expected_gross_profit: u128,
    pub buy_leg_impact_bps: u64,
    pub sell_leg_impact_bps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Profitable(ArbSolution),
    /// The best candidate failed to clear the configured net-profit floor.
    NoProfit,
    /// The constraining pool cannot absorb the minimum trade size without
    /// exceeding the configured price-impact ceiling.
    InsufficientLiquidity,
}

/// Configurable floors the solver must clear before reporting a solution
/// (spec §4.9, "Failure semantics").
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub min_profit_abs: u128,
    pub min_profit_bps: u64,
    pub min_trade_size: u128,
    pub max_impact_bps: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            min_profit_abs: 0,
            min_profit_bps: 0,
            min_trade_size: 1,
            max_impact_bps: 2_000,
        }
    }
}

pub struct ArbSolver {
    pub config: SolverConfig,
}

impl Default for ArbSolver {
    fn default() -> Self {
        Self { config: SolverConfig::default() }
    }
}

struct Probe {
    amount: u128,
    profit: i128,
    buy_impact_bps: u64,
    sell_impact_bps: u64,
}

impl ArbSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// `quote_buy` spends the input token to acquire the mid token from the
    /// buy-side pool; `quote_sell` sells that mid-token amount back into the
    /// quote token on the sell-side pool. Both are read-only simulator
    /// calls supplied by the caller (spec §9: no trait-object collaborator
    /// interface inside the core).
    pub fn solve(
        &self,
        quote_buy: impl Fn(u128) -> SimOutcome,
        quote_sell: impl Fn(u128) -> SimOutcome,
        max_input: u128,
        cpmm_shortcut: Option<(CpmmShortcutLeg, CpmmShortcutLeg)>,
    ) -> SolveOutcome {
        if max_input == 0 {
            return SolveOutcome::InsufficientLiquidity;
        }

        let probe = |amount: u128| -> Option<Probe> {
            if amount == 0 {
                return Some(Probe {
                    amount: 0,
                    profit: 0,
                    buy_impact_bps: 0,
                    sell_impact_bps: 0,
                });
            }
            let bought = match quote_buy(amount) {
                Ok(r) => r,
                Err(SimError::PoolDrained) | Err(SimError::InsufficientLiquidity) => return None,
            };
            let sold = match quote_sell(bought.amount_out) {
                Ok(r) => r,
                Err(SimError::PoolDrained) | Err(SimError::InsufficientLiquidity) => return None,
            };
            let profit = sold.amount_out as i128 - amount as i128;
            Some(Probe {
                amount,
                profit,
                buy_impact_bps: bought.impact_bps,
                sell_impact_bps: sold.impact_bps,
            })
        };

        let initial_guess = cpmm_shortcut
            .map(|(buy, sell)| closed_form_initial_guess(buy, sell))
            .unwrap_or(max_input / 2)
            .clamp(1, max_input);

        let mut lo: u128 = 0;
        let mut hi: u128 = max_input;
        let mut best: Option<Probe> = probe(0);
        let mut mid = initial_guess;

        for i in 0..ARB_SOLVER_MAX_ITERATIONS {
            if hi <= lo {
                break;
            }
            if i > 0 {
                mid = lo + (hi - lo) / 2;
            }
            if let Some(p) = probe(mid) {
                if best.as_ref().map(|b| p.profit > b.profit).unwrap_or(true) {
                    best = Some(p);
                }
            }

            let span = (hi - lo).max(2);
            let step = (span.saturating_mul(ARB_SOLVER_GRADIENT_PROBE_BPS as u128) / 10_000).max(1);
            let left = mid.saturating_sub(step).max(lo);
            let right = (mid.saturating_add(step)).min(hi);
            let profit_left = probe(left).map(|p| p.profit).unwrap_or(i128::MIN);
            let profit_right = probe(right).map(|p| p.profit).unwrap_or(i128::MIN);

            if profit_right >= profit_left {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let best = match best {
            Some(b) if b.amount > 0 => b,
            _ => return SolveOutcome::InsufficientLiquidity,
        };

        if best.amount < self.config.min_trade_size {
            return SolveOutcome::InsufficientLiquidity;
        }
        if best.buy_impact_bps > self.config.max_impact_bps || best.sell_impact_bps > self.config.max_impact_bps {
            return SolveOutcome::InsufficientLiquidity;
        }
        if best.profit <= 0 {
            return SolveOutcome::NoProfit;
        }
        let profit = best.profit as u128;
        let meets_abs_floor = profit >= self.config.min_profit_abs;
        let meets_bps_floor = profit.saturating_mul(10_000) / best.amount.max(1) >= self.config.min_profit_bps as u128;
        if !meets_abs_floor || !meets_bps_floor {
            return SolveOutcome::NoProfit;
        }

        SolveOutcome::Profitable(ArbSolution {
            optimal_input: best.amount,
            expected_gross_profit: profit,
            buy_leg_impact_bps: best.buy_impact_bps,
            sell_leg_impact_bps: best.sell_impact_bps,
        })
    }
}

/// Closed-form optimal input for two constant-product pools on the same
/// pair (classic two-pool arbitrage formula), used only to seed the
/// bracket search — never trusted as the final answer, since it is
/// computed in floating point and ignores the iteration cap / impact
/// ceiling entirely.
pub(crate) fn closed_form_initial_guess(buy: CpmmShortcutLeg, sell: CpmmShortcutLeg) -> u128 {
    let gamma_b = (10_000 - buy.fee_bps.min(10_000)) as f64 / 10_000.0;
    let gamma_s = (10_000 - sell.fee_bps.min(10_000)) as f64 / 10_000.0;
    let rb_in = buy.reserve_in as f64;
    let rb_out = buy.reserve_out as f64;
    let rs_in = sell.reserve_in as f64;
    let rs_out = sell.reserve_out as f64;

    let numerator = (gamma_b * gamma_s * rb_in * rb_out * rs_in * rs_out).sqrt() - rb_in * rs_in;
    let denominator = gamma_s * rs_in + gamma_b * gamma_s * rb_out;
    if denominator <= 0.0 || numerator <= 0.0 || !numerator.is_finite() {
        return 0;
    }
    let guess = numerator / denominator;
    if !guess.is_finite() || guess <= 0.0 {
        0
    } else {
        guess as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::cpmm;

    fn cpmm_quote(reserve_in: u128, reserve_out: u128, fee_bps: u64) -> impl Fn(u128) -> SimOutcome {
        move |amount_in: u128| cpmm::simulate_exact_input(amount_in, reserve_in, reserve_out, fee_bps)
    }

    // Scenario S2: identical reserves and nonzero fees on both legs -> no
    // sequence of trades can profit; solver reports `NoProfit`.
    #[test]
    fn identical_pools_with_fees_yield_no_profit_scenario_s2() {
        let solver = ArbSolver::default();
        let buy = cpmm_quote(1_000_000_000, 1_000_000_000, 25);
        let sell = cpmm_quote(1_000_000_000, 1_000_000_000, 30);
        let outcome = solver.solve(
            buy,
            sell,
            10_000_000,
            Some((
                CpmmShortcutLeg { reserve_in: 1_000_000_000, reserve_out: 1_000_000_000, fee_bps: 25 },
                CpmmShortcutLeg { reserve_in: 1_000_000_000, reserve_out: 1_000_000_000, fee_bps: 30 },
            )),
        );
        assert_eq!(outcome, SolveOutcome::NoProfit);
    }

    #[test]
    fn mispriced_pools_yield_a_profitable_solution() {
        let solver = ArbSolver::default();
        // Buy-pool is cheap in the mid token; sell-pool is rich in quote.
        let buy = cpmm_quote(2_000_000_000, 1_000_000_000, 10);
        let sell = cpmm_quote(500_000_000, 2_000_000_000, 10);
        let outcome = solver.solve(
            buy,
            sell,
            50_000_000,
            Some((
                CpmmShortcutLeg { reserve_in: 2_000_000_000, reserve_out: 1_000_000_000, fee_bps: 10 },
                CpmmShortcutLeg { reserve_in: 500_000_000, reserve_out: 2_000_000_000, fee_bps: 10 },
            )),
        );
        match outcome {
            SolveOutcome::Profitable(solution) => {
                assert!(solution.optimal_input > 0);
                assert!(solution.expected_gross_profit > 0);
            }
            other => panic!("expected a profitable solution, got {other:?}"),
        }
    }

    #[test]
    fn zero_max_input_is_insufficient_liquidity() {
        let solver = ArbSolver::default();
        let buy = cpmm_quote(1_000, 1_000, 0);
        let sell = cpmm_quote(1_000, 1_000, 0);
        assert_eq!(solver.solve(buy, sell, 0, None), SolveOutcome::InsufficientLiquidity);
    }

    #[test]
    fn drained_buy_pool_yields_insufficient_liquidity() {
        let solver = ArbSolver::new(SolverConfig {
            min_trade_size: 1,
            ..SolverConfig::default()
        });
        // Reserve so small any meaningful trade drains it.
        let buy = cpmm_quote(10, 10, 0);
        let sell = cpmm_quote(1_000_000, 1_000_000, 0);
        let outcome = solver.solve(buy, sell, 1_000, None);
        assert!(matches!(outcome, SolveOutcome::InsufficientLiquidity | SolveOutcome::NoProfit));
    }
}

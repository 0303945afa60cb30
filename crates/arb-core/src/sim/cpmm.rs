//! Constant-product simulator (spec §4.6). Exact integer math; panics (per
//! spec) if a caller ever manages to request an output `>= reserve_out` —
//! callers are expected to route around that via [`SimError::PoolDrained`]
//! rather than ever constructing such a request from real reserves.

use arb_math::cpmm;

use super::{Confidence, SimError, SimOutcome, SimResult};

/// Forward (exact-input) quote against reserves `(reserve_in, reserve_out)`
/// at `fee_bps`.
pub fn simulate_exact_input(
    amount_in: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee_bps: u64,
) -> SimOutcome {
    let fee = cpmm::bps_to_hundred_thousandths(fee_bps);
    let amount_out = cpmm::quote_exact_input(amount_in, reserve_in, reserve_out, fee)
        .map_err(|_| SimError::InsufficientLiquidity)?;
    if amount_out >= reserve_out {
        panic!("constant-product simulation would drain the pool: out={amount_out} reserve_out={reserve_out}");
    }
    let after_fee_in = amount_in - fee_paid_from_input(amount_in, fee_bps);
    let fee_paid = amount_in - after_fee_in;
    let impact_bps = cpmm::price_impact_bps(amount_in, amount_out, reserve_in, reserve_out)
        .map_err(|_| SimError::InsufficientLiquidity)?;
    Ok(SimResult {
        amount_out,
        fee_paid,
        impact_bps,
        confidence: Confidence::Full,
    })
}

/// Inverse (exact-output) quote: amount of input required for exactly
/// `amount_out`, rounded up (spec §4.6).
pub fn quote_input_for_output(
    amount_out: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee_bps: u64,
) -> Result<u128, SimError> {
    if amount_out >= reserve_out {
        return Err(SimError::PoolDrained);
    }
    let fee = cpmm::bps_to_hundred_thousandths(fee_bps);
    cpmm::quote_exact_output(amount_out, reserve_in, reserve_out, fee).map_err(|_| SimError::InsufficientLiquidity)
}

fn fee_paid_from_input(amount_in: u128, fee_bps: u64) -> u128 {
    let fee = cpmm::bps_to_hundred_thousandths(fee_bps);
    arb_math::big_int::mul_div_u128(amount_in, fee, cpmm::FEE_DENOMINATOR, arb_math::big_int::Rounding::Down)
        .unwrap_or(0)
}

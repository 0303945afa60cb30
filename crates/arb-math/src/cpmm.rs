//! Exact integer constant-product swap math (spec §4.6).
//!
//! Fees are expressed in hundred-thousandths (`CPMM_FEE_DENOMINATOR` =
//! 1_000_000) to match the source formula's precision, not in basis points.

use arb_types::BPS_DENOMINATOR;

use crate::big_int::{mul_div_u128, Rounding};
use crate::error::{MathError, MathResult};

pub const FEE_DENOMINATOR: u128 = 1_000_000;

/// Forward (exact-input) quote: amount of `out` token received for `amount_in`
/// of `in` token against reserves `(reserve_in, reserve_out)` at fee `fee_hundred_thousandths`.
pub fn quote_exact_input(
    amount_in: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee_hundred_thousandths: u128,
) -> MathResult<u128> {
    if fee_hundred_thousandths > FEE_DENOMINATOR {
        return Err(MathError::Overflow);
    }
    let after_fee = mul_div_u128(
        amount_in,
        FEE_DENOMINATOR - fee_hundred_thousandths,
        FEE_DENOMINATOR,
        Rounding::Down,
    )?;
    let denom = reserve_in.checked_add(after_fee).ok_or(MathError::Overflow)?;
    mul_div_u128(reserve_out, after_fee, denom, Rounding::Down)
}

/// Inverse (exact-output) quote: amount of `in` token required to receive
/// exactly `amount_out`, rounded up so the pool never under-collects.
pub fn quote_exact_output(
    amount_out: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee_hundred_thousandths: u128,
) -> MathResult<u128> {
    if amount_out >= reserve_out {
        return Err(MathError::Overflow);
    }
    if fee_hundred_thousandths >= FEE_DENOMINATOR {
        return Err(MathError::Overflow);
    }
    let numerator = mul_div_u128(
        reserve_in,
        amount_out,
        reserve_out - amount_out,
        Rounding::Up,
    )?;
    mul_div_u128(
        numerator,
        FEE_DENOMINATOR,
        FEE_DENOMINATOR - fee_hundred_thousandths,
        Rounding::Up,
    )
}

/// Price impact in basis points of an exact-input swap, measured against the
/// pre-swap spot price `reserve_out / reserve_in`.
pub fn price_impact_bps(
    amount_in: u128,
    amount_out: u128,
    reserve_in: u128,
    reserve_out: u128,
) -> MathResult<u64> {
    if reserve_in == 0 || amount_in == 0 {
        return Ok(0);
    }
    // Expected output at spot price: amount_in * reserve_out / reserve_in.
    let expected_out = mul_div_u128(amount_in, reserve_out, reserve_in, Rounding::Down)?;
    if expected_out == 0 {
        return Ok(0);
    }
    if amount_out >= expected_out {
        return Ok(0);
    }
    let shortfall = expected_out - amount_out;
    let bps = mul_div_u128(shortfall, BPS_DENOMINATOR as u128, expected_out, Rounding::Down)?;
    Ok(bps.min(BPS_DENOMINATOR as u128) as u64)
}

/// Converts a fee in basis points (as learned by the fee oracle) to the
/// hundred-thousandths denominator this module's formulas use.
pub fn bps_to_hundred_thousandths(fee_bps: u64) -> u128 {
    (fee_bps as u128) * (FEE_DENOMINATOR / BPS_DENOMINATOR as u128)
}

/// Closed-form constant-product fee inference: recovers the effective
/// fee, in basis points, implied by observed `(amount_in, amount_out)`
/// against pre-swap reserves `(reserve_in, reserve_out)`.
pub fn infer_fee_bps(
    amount_in: u128,
    amount_out: u128,
    reserve_in: u128,
    reserve_out: u128,
) -> MathResult<i128> {
    if amount_out >= reserve_out || amount_in == 0 {
        return Err(MathError::Overflow);
    }
    let effective_input = mul_div_u128(
        amount_out,
        reserve_in * 10_000,
        reserve_out - amount_out,
        Rounding::Down,
    )?;
    let effective_input_bps = mul_div_u128(effective_input, 10_000, amount_in * 10_000, Rounding::Down)?;
    Ok(10_000i128 - effective_input_bps as i128)
}

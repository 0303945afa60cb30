//! Discretised-bin ("DLMM") swap math: per-bin price, the dynamic fee
//! formula, and the exact-integer amount conversions the bin-walking
//! simulator needs at each step.
//!
//! Modeled on the bin-step / volatility-accumulator fee scheme common to
//! discretised-bin AMMs (see `StaticParameters`/`VariableParameters` in the
//! pack's Meteora DLMM account layout reference).

use crate::big_int::{mul_div_u128, Rounding};
use crate::error::{MathError, MathResult};
use crate::tick_math::Q64;

/// Basis-point denominator for bin-step and fee math.
pub const BPS: u128 = 10_000;

/// Price of token Y per unit of token X at `bin_id`, in Q64.64:
/// `(1 + bin_step/10000)^bin_id`. `bin_step` is itself in basis points.
pub fn bin_price_q64(bin_step_bps: u16, bin_id: i32) -> MathResult<u128> {
    let base = Q64 + mul_div_u128(Q64, bin_step_bps as u128, BPS, Rounding::Down)?;
    pow_q64(base, bin_id)
}

/// `base^exponent` in Q64.64 by exponentiation by squaring; negative
/// exponents take the reciprocal of the positive-exponent result.
fn pow_q64(base: u128, exponent: i32) -> MathResult<u128> {
    let mut result = Q64;
    let mut b = base;
    let mut e = exponent.unsigned_abs();
    while e > 0 {
        if e & 1 == 1 {
            result = mul_div_u128(result, b, Q64, Rounding::Down)?;
        }
        b = mul_div_u128(b, b, Q64, Rounding::Down)?;
        e >>= 1;
    }
    if exponent < 0 {
        if result == 0 {
            return Err(MathError::DivisionByZero);
        }
        mul_div_u128(Q64, Q64, result, Rounding::Down)
    } else {
        Ok(result)
    }
}

/// Amount of Y obtained for `amount_x` at `price_q64` (Y per X).
pub fn y_for_x(amount_x: u128, price_q64: u128) -> MathResult<u128> {
    mul_div_u128(amount_x, price_q64, Q64, Rounding::Down)
}

/// Amount of X required to obtain `amount_y` at `price_q64` (Y per X).
pub fn x_for_y(amount_y: u128, price_q64: u128) -> MathResult<u128> {
    if price_q64 == 0 {
        return Err(MathError::DivisionByZero);
    }
    mul_div_u128(amount_y, Q64, price_q64, Rounding::Up)
}

/// `base_factor * bin_step`, the static component of the fee, in basis points.
pub fn base_fee_bps(base_factor: u16, bin_step_bps: u16) -> u64 {
    (base_factor as u64) * (bin_step_bps as u64) / 100
}

/// Volatility-driven component of the fee, in basis points, capped at
/// `max_volatility_accumulator` by the caller before this is invoked.
/// `variable_fee_control` scales `(volatility_accumulator * bin_step)^2`.
pub fn variable_fee_bps(
    volatility_accumulator: u32,
    bin_step_bps: u16,
    variable_fee_control: u32,
) -> MathResult<u64> {
    let product = (volatility_accumulator as u128) * (bin_step_bps as u128);
    let squared = product.checked_mul(product).ok_or(MathError::Overflow)?;
    let scaled = squared
        .checked_mul(variable_fee_control as u128)
        .ok_or(MathError::Overflow)?;
    // variable_fee_control is expressed in parts-per-hundred-million so the
    // squared bin-step/volatility term lands in basis points.
    Ok((scaled / 100_000_000).min(BPS) as u64)
}

/// Total swap fee in basis points and the protocol's share of it.
pub fn dynamic_fee_bps(
    base_factor: u16,
    bin_step_bps: u16,
    volatility_accumulator: u32,
    variable_fee_control: u32,
    protocol_share_bps: u16,
) -> MathResult<(u64, u64)> {
    let base = base_fee_bps(base_factor, bin_step_bps);
    let variable = variable_fee_bps(volatility_accumulator, bin_step_bps, variable_fee_control)?;
    let total = (base + variable).min(BPS as u64);
    let protocol = mul_div_u128(total as u128, protocol_share_bps as u128, BPS, Rounding::Down)?;
    Ok((total, protocol as u64))
}

/// Splits `amount_in` into `(after_fee, fee_paid)` at `fee_bps`.
pub fn apply_fee(amount_in: u128, fee_bps: u64) -> MathResult<(u128, u128)> {
    if fee_bps as u128 > BPS {
        return Err(MathError::Overflow);
    }
    let fee_paid = mul_div_u128(amount_in, fee_bps as u128, BPS, Rounding::Up)?;
    let after_fee = amount_in.checked_sub(fee_paid).ok_or(MathError::Overflow)?;
    Ok((after_fee, fee_paid))
}

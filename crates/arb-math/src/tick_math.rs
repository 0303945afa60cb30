//! Conversions between ticks and Q64.64 square-root price, shared by the
//! concentrated-liquidity simulator and the topology oracle.

use crate::big_int::{mul_div_u128, Rounding, U256};
use crate::error::{MathError, MathResult};

pub const MIN_TICK: i32 = -443_636;
pub const MAX_TICK: i32 = 443_636;

/// `sqrt(1.0001)^MIN_TICK` in Q64.64.
pub const MIN_SQRT_PRICE_X64: u128 = 4_295_048_016;
/// `sqrt(1.0001)^MAX_TICK` in Q64.64.
pub const MAX_SQRT_PRICE_X64: u128 = 79_226_673_515_401_279_992_447_579_055;

pub const Q64: u128 = 1u128 << 64;

/// Pre-computed `sqrt(1.0001)^(2^i)` in Q64.64, used for binary decomposition
/// of the tick magnitude.
const MAGIC_SQRT_1_0001_POW_2: [u128; 20] = [
    18_446_808_569_878_950_912,
    18_447_134_875_309_251_715,
    18_447_788_169_134_960_386,
    18_449_095_795_169_968_956,
    18_452_014_230_994_128_635,
    18_458_166_817_563_198_432,
    18_471_618_969_925_737_856,
    18_499_931_457_322_659_840,
    18_558_637_110_719_970_304,
    18_679_370_726_829_963_264,
    18_928_236_417_948_540_928,
    19_451_367_230_682_021_888,
    20_605_423_956_018_225_152,
    23_325_457_043_927_080_960,
    30_423_823_330_301_186_048,
    56_566_953_143_375_020_032,
    227_809_249_476_094_689_280,
    18_709_476_082_618_564_266_843_504_640,
    2_891_605_450_058_869_263_366_914_764_612_820_992,
    68_784_512_281_246_656_890_519_855,
];

pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}

/// `sqrt(1.0001)^tick` as a Q64.64 fixed-point value.
pub fn sqrt_price_at_tick(tick: i32) -> MathResult<u128> {
    if !is_tick_valid(tick) {
        return Err(MathError::TickOutOfRange);
    }
    let abs_tick = tick.unsigned_abs();
    let mut ratio = Q64;
    for (i, magic) in MAGIC_SQRT_1_0001_POW_2.iter().enumerate() {
        if abs_tick & (1 << i) != 0 {
            ratio = mul_shift_q64(ratio, *magic)?;
        }
    }
    if tick < 0 {
        ratio = reciprocal_q64(ratio)?;
    }
    Ok(ratio)
}

/// Inverse of [`sqrt_price_at_tick`]: the tick whose sqrt-price is the
/// greatest value `<= sqrt_price` (binary search, mirrors the on-chain
/// program's rounding-down convention for tick lookup).
pub fn tick_at_sqrt_price(sqrt_price: u128) -> MathResult<i32> {
    if !(MIN_SQRT_PRICE_X64..=MAX_SQRT_PRICE_X64).contains(&sqrt_price) {
        return Err(MathError::SqrtPriceOutOfRange);
    }
    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        let mid_price = sqrt_price_at_tick(mid)?;
        if mid_price <= sqrt_price {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

/// Rounds `tick` to the nearest multiple of `spacing` at or before
/// (`lte = true`) or at or after (`lte = false`) `tick`.
pub fn next_initializable_tick(tick: i32, spacing: i32, lte: bool) -> i32 {
    let compressed = if lte {
        let c = tick.div_euclid(spacing);
        c
    } else {
        let c = tick.div_euclid(spacing);
        if tick % spacing != 0 {
            c + 1
        } else {
            c
        }
    };
    compressed * spacing
}

fn mul_shift_q64(a: u128, b: u128) -> MathResult<u128> {
    mul_div_u128(a, b, Q64, Rounding::Down)
}

/// `Q64.64^2 / value`: the Q64.64 reciprocal of `value`. Public because the
/// CLMM delta math in [`crate::clmm`] needs it directly.
pub fn reciprocal_q64(value: u128) -> MathResult<u128> {
    if value == 0 {
        return Err(MathError::DivisionByZero);
    }
    let q64_squared = U256::mul_u128(Q64, Q64);
    q64_squared
        .div_u128(value)
        .and_then(|q| q.to_u128())
        .ok_or(MathError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_zero_is_unity() {
        assert_eq!(sqrt_price_at_tick(0).unwrap(), Q64);
    }

    #[test]
    fn bounds_match_published_constants() {
        assert_eq!(sqrt_price_at_tick(MIN_TICK).unwrap(), MIN_SQRT_PRICE_X64);
        assert_eq!(sqrt_price_at_tick(MAX_TICK).unwrap(), MAX_SQRT_PRICE_X64);
    }

    #[test]
    fn round_trip_recovers_the_tick() {
        for tick in [MIN_TICK, -100_000, -1000, -1, 0, 1, 1000, 100_000, MAX_TICK] {
            let price = sqrt_price_at_tick(tick).unwrap();
            assert_eq!(tick_at_sqrt_price(price).unwrap(), tick);
        }
    }

    #[test]
    fn out_of_range_tick_is_rejected() {
        assert_eq!(
            sqrt_price_at_tick(MAX_TICK + 1),
            Err(MathError::TickOutOfRange)
        );
    }

    #[test]
    fn next_initializable_tick_rounds_toward_requested_side() {
        assert_eq!(next_initializable_tick(5, 10, true), 0);
        assert_eq!(next_initializable_tick(5, 10, false), 10);
        assert_eq!(next_initializable_tick(-5, 10, true), -10);
        assert_eq!(next_initializable_tick(-5, 10, false), 0);
        assert_eq!(next_initializable_tick(10, 10, true), 10);
    }
}

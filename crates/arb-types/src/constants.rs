//! Protocol-wide numeric constants.

/// Ticks packed into a single concentrated-liquidity tick-array account.
pub const TICKS_PER_ARRAY: usize = 60;

/// Bins packed into a single discretised-bin array account.
pub const BINS_PER_ARRAY: usize = 70;

/// Width of a pool's tick/bin-array occupancy bitmap, in bits.
pub const OCCUPANCY_BITMAP_BITS: usize = 1024;

/// Occupancy bitmap word width.
pub const OCCUPANCY_BITMAP_WORD_BITS: u32 = 64;
pub const OCCUPANCY_BITMAP_WORDS: usize = OCCUPANCY_BITMAP_BITS / OCCUPANCY_BITMAP_WORD_BITS as usize;

/// Default tick-array search radius for the topology oracle (§4.4).
pub const DEFAULT_TICK_ARRAY_RADIUS: i32 = 7;

/// Default bin-array neighbour radius for the topology oracle (§4.4).
pub const DEFAULT_BIN_ARRAY_RADIUS: i32 = 1;

/// Basis-point denominator (100% = 10_000 bps).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Constant-product fee denominator (hundred-thousandths, per §4.6).
pub const CPMM_FEE_DENOMINATOR: u64 = 1_000_000;

/// Fee-oracle sanity window, inclusive, in basis points.
pub const FEE_ORACLE_MIN_BPS: u64 = 0;
pub const FEE_ORACLE_MAX_BPS: u64 = 200;

/// Fee-oracle fallback when no observation has been learned yet.
pub const DEFAULT_FEE_BPS: u64 = 30;

/// Minimum interval between refreshes of the same pool, in milliseconds.
pub const DEFAULT_MIN_REFRESH_INTERVAL_MS: u64 = 5_000;

/// Hard cap on binary-search iterations in the arbitrage solver (§4.9).
pub const ARB_SOLVER_MAX_ITERATIONS: u32 = 40;

/// Gradient probe size used to pick the solver's search direction, in bps.
pub const ARB_SOLVER_GRADIENT_PROBE_BPS: u64 = 100;

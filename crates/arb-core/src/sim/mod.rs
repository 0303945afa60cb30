//! Simulation engines (spec §4.6-4.8): read-only against the cache family,
//! never write. Dispatch is a `match` on [`arb_types::Venue`] rather than a
//! trait object, per the design note in spec §9.

pub mod clmm;
pub mod cpmm;
pub mod dlmm;

use arb_types::Direction;

/// How much to trust a simulation result. `ReducedSingleTick` means the
/// CLMM simulator fell back to a sqrt-price-only approximation because the
/// tick cache could not supply the full walk (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Full,
    ReducedSingleTick,
}

/// A completed swap quote, common across all three venue families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimResult {
    pub amount_out: u128,
    pub fee_paid: u128,
    pub impact_bps: u64,
    pub confidence: Confidence,
}

/// Why a simulation could not produce a quote (spec §7,
/// "Simulation-out-of-range").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// The swap would drain the pool's output side entirely.
    PoolDrained,
    /// The requested direction has no liquidity to walk at all (e.g. an
    /// empty occupancy bitmap, scenario S6).
    InsufficientLiquidity,
}

pub type SimOutcome = Result<SimResult, SimError>;

#[derive(Debug, Clone, Copy)]
pub struct SwapRequest {
    pub amount_in: u128,
    pub direction: Direction,
    pub fee_override_bps: Option<u64>,
    /// Caller-supplied stop price for the CLMM walk (spec §4.7, "or when a
    /// caller-supplied √P limit is reached"). Ignored by the CPMM and DLMM
    /// simulators.
    pub sqrt_price_limit_x64: Option<u128>,
}

//! Cached entity shapes (spec §3). Every entity carries its own
//! `slot`/`write_sequence`/`source` so the monotonic-write check in
//! [`crate::cache::VersionedStore`] needs no side channel.

use arb_types::{Key, Source, Venue};

use crate::bitmap::Bitmap1024;

/// Common fields every pool record carries, independent of venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub key: Key,
    pub base_mint: Key,
    pub quote_mint: Key,
    pub base_vault: Key,
    pub quote_vault: Key,
    pub slot: u64,
    pub write_sequence: u64,
    pub source: Source,
    pub venue: VenueState,
}

impl PoolEntry {
    pub fn venue_tag(&self) -> Venue {
        match &self.venue {
            VenueState::CpmmExplicitFee { .. } => Venue::CpmmExplicitFee,
            VenueState::CpmmSharedFee { .. } => Venue::CpmmSharedFee,
            VenueState::Clmm(_) => Venue::Clmm,
            VenueState::Dlmm(_) => Venue::Dlmm,
        }
    }
}

/// Venue-specific pool attributes (spec §3 table), modeled as a tagged sum
/// so simulation dispatch is a branch-predictable `match` rather than
/// virtual dispatch (design note, spec §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueState {
    CpmmExplicitFee { fee_numerator: u64, fee_denominator: u64 },
    CpmmSharedFee { fee_config: Key },
    Clmm(ClmmState),
    Dlmm(DlmmState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClmmState {
    pub tick_spacing: u16,
    pub current_tick: i32,
    pub sqrt_price_x64: u128,
    pub liquidity: u128,
    pub occupancy: Bitmap1024,
    pub fee_config: Key,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlmmState {
    pub bin_step_bps: u16,
    pub active_bin_id: i32,
    pub base_factor: u16,
    pub volatility_accumulator: u32,
    pub variable_fee_control: u32,
    pub protocol_share_bps: u16,
    pub occupancy: Bitmap1024,
}

/// Token-account balance for a vault (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultEntry {
    pub key: Key,
    pub amount: u64,
    pub slot: u64,
    pub write_sequence: u64,
    pub source: Source,
}

/// One of the 60 ticks packed into a tick-array account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
}

impl Tick {
    pub fn is_initialized(&self) -> bool {
        self.liquidity_gross != 0
    }
}

/// A concentrated-liquidity tick-array entry, keyed by (pool, start_tick).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickArrayEntry {
    pub pool: Key,
    pub start_tick: i32,
    /// The actual on-chain tick-array account key, used only for the
    /// secondary diagnostic index — never for lifetime or ownership.
    pub account_key: Key,
    pub ticks: Vec<Tick>,
    pub slot: u64,
    pub write_sequence: u64,
    pub source: Source,
}

/// One of the 70 bins packed into a bin-array account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bin {
    pub amount_x: u64,
    pub amount_y: u64,
}

/// A discretised-bin array entry, keyed by (pool, array_index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinArrayEntry {
    pub pool: Key,
    pub array_index: i32,
    pub account_key: Key,
    pub bins: Vec<Bin>,
    pub slot: u64,
    pub write_sequence: u64,
    pub source: Source,
}

/// Venue-family fee config (CLMM fee tiers, DLMM fee tables), keyed by the
/// fee-config account referenced from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueConfigEntry {
    pub key: Key,
    pub fee_bps: u32,
    pub slot: u64,
    pub write_sequence: u64,
    pub source: Source,
}

/// Singleton constant-product fee config, shared by every `CpmmSharedFee`
/// pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingletonConfigEntry {
    pub key: Key,
    pub fee_numerator: u64,
    pub fee_denominator: u64,
    pub slot: u64,
    pub write_sequence: u64,
    pub source: Source,
}

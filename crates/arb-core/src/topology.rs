//! Topology oracle (spec §4.4): computes exactly which dependency keys a
//! pool's simulator will need, and whether they are all present in the
//! caches at sufficient freshness.

use arb_types::{Key, Venue, DEFAULT_BIN_ARRAY_RADIUS, DEFAULT_TICK_ARRAY_RADIUS, TICKS_PER_ARRAY};

use crate::cache::{BinCache, SingletonConfigCache, TickCache, VaultCache, VenueConfigCache};
use crate::entities::{PoolEntry, VenueState};

/// Immutable snapshot captured at freeze time (spec §3, "Frozen topology").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenTopology {
    pub pool: Key,
    pub venue: Venue,
    pub base_vault: Key,
    pub quote_vault: Key,
    /// Required tick-array start indices (CLMM only).
    pub tick_arrays: Vec<i32>,
    /// Required bin-array indices (DLMM only).
    pub bin_arrays: Vec<i32>,
    pub fee_config: Option<Key>,
    pub freeze_slot: u64,
}

/// A single missing dependency, as reported to the bootstrap collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRef {
    Vault(Key),
    TickArray(Key, i32),
    BinArray(Key, i32),
    FeeConfig(Key),
}

pub struct TopologyOracle {
    pub tick_array_radius: i32,
    pub bin_array_radius: i32,
}

impl Default for TopologyOracle {
    fn default() -> Self {
        Self {
            tick_array_radius: DEFAULT_TICK_ARRAY_RADIUS,
            bin_array_radius: DEFAULT_BIN_ARRAY_RADIUS,
        }
    }
}

impl TopologyOracle {
    /// Computes the pool's full dependency set from its current on-chain
    /// state. Callers pass `None` when the pool account itself is not yet
    /// present; this mirrors `compute_topology` returning null in that case
    /// (spec §4.4).
    pub fn compute_topology(&self, pool: Option<&PoolEntry>) -> Option<FrozenTopology> {
        let pool = pool?;
        let (tick_arrays, bin_arrays, fee_config) = match &pool.venue {
            VenueState::CpmmExplicitFee { .. } => (vec![], vec![], None),
            VenueState::CpmmSharedFee { fee_config } => (vec![], vec![], Some(*fee_config)),
            VenueState::Clmm(clmm) => {
                let array_span = (clmm.tick_spacing as i32) * (TICKS_PER_ARRAY as i32);
                let current_array = clmm.current_tick.div_euclid(array_span.max(1));
                let arrays = clmm
                    .occupancy
                    .set_indices_in_range(current_array, self.tick_array_radius)
                    .into_iter()
                    .map(|array_idx| array_idx * array_span)
                    .collect();
                (arrays, vec![], Some(clmm.fee_config))
            }
            VenueState::Dlmm(dlmm) => {
                let bins_per_array = arb_types::BINS_PER_ARRAY as i32;
                let home_array = dlmm.active_bin_id.div_euclid(bins_per_array.max(1));
                let arrays = dlmm
                    .occupancy
                    .set_indices_in_range(home_array, self.bin_array_radius);
                (vec![], arrays, None)
            }
        };

        Some(FrozenTopology {
            pool: pool.key,
            venue: pool.venue_tag(),
            base_vault: pool.base_vault,
            quote_vault: pool.quote_vault,
            tick_arrays,
            bin_arrays,
            fee_config,
            freeze_slot: pool.slot,
        })
    }

    /// Whether every dependency in `topology` resolves in its cache at
    /// `slot >= topology.freeze_slot` (spec §3, "Invariants").
    #[allow(clippy::too_many_arguments)]
    pub fn is_topology_complete(
        &self,
        topology: &FrozenTopology,
        vaults: &VaultCache,
        ticks: &TickCache,
        bins: &BinCache,
        venue_configs: &VenueConfigCache,
        singleton_configs: &SingletonConfigCache,
    ) -> bool {
        self.missing_dependencies(topology, vaults, ticks, bins, venue_configs, singleton_configs)
            .is_empty()
    }

    /// The gap list so the bootstrap collaborator can fetch precisely what
    /// is needed, and nothing more.
    #[allow(clippy::too_many_arguments)]
    pub fn missing_dependencies(
        &self,
        topology: &FrozenTopology,
        vaults: &VaultCache,
        ticks: &TickCache,
        bins: &BinCache,
        venue_configs: &VenueConfigCache,
        singleton_configs: &SingletonConfigCache,
    ) -> Vec<DependencyRef> {
        let mut missing = Vec::new();
        let fresh_enough = topology.freeze_slot;

        for vault in [topology.base_vault, topology.quote_vault] {
            match vaults.peek(&vault) {
                Some(entry) if entry.slot >= fresh_enough => {}
                _ => missing.push(DependencyRef::Vault(vault)),
            }
        }

        for &start in &topology.tick_arrays {
            match ticks.peek(&(topology.pool, start)) {
                Some(entry) if entry.slot >= fresh_enough => {}
                _ => missing.push(DependencyRef::TickArray(topology.pool, start)),
            }
        }

        for &idx in &topology.bin_arrays {
            match bins.peek(&(topology.pool, idx)) {
                Some(entry) if entry.slot >= fresh_enough => {}
                _ => missing.push(DependencyRef::BinArray(topology.pool, idx)),
            }
        }

        // Fee-config freshness is checked against the cache the venue
        // actually reads it from: CLMM/DLMM fee tiers live in the
        // per-pool venue-config cache, constant-product's shared fee
        // singleton in the singleton-config cache.
        if let Some(fee_config) = topology.fee_config {
            let resolved = if topology.venue == Venue::CpmmSharedFee {
                singleton_configs.peek(&fee_config).map(|e| e.slot)
            } else {
                venue_configs.peek(&fee_config).map(|e| e.slot)
            };
            match resolved {
                Some(slot) if slot >= fresh_enough => {}
                _ => missing.push(DependencyRef::FeeConfig(fee_config)),
            }
        }

        missing
    }
}

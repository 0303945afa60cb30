//! Lifecycle registry (spec §4.3): the state machine governing when a
//! best-effort bootstrap fetch may write a pool's dependencies, and the
//! reverse-mapping tables the canonical commit function consults to find
//! the owning pool for a vault/tick/bin/fee-config event.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use arb_types::{Key, DEFAULT_MIN_REFRESH_INTERVAL_MS};

use crate::topology::FrozenTopology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Discovered,
    TopologyFrozen,
    Active,
    Refreshing,
}

impl LifecycleState {
    fn label(self) -> &'static str {
        match self {
            LifecycleState::Discovered => "discovered",
            LifecycleState::TopologyFrozen => "topology_frozen",
            LifecycleState::Active => "active",
            LifecycleState::Refreshing => "refreshing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("pool {0:?} is not known to the lifecycle registry")]
    UnknownPool(Key),
    #[error("invalid transition from {0} to {1}")]
    InvalidTransition(&'static str, &'static str),
    #[error("refresh attempted before the minimum interval elapsed")]
    RateLimited,
}

#[derive(Debug, Clone)]
pub struct LifecycleEntry {
    pub pool: Key,
    pub state: LifecycleState,
    pub discovery_slot: u64,
    pub discovered_at: Instant,
    pub frozen_topology: Option<FrozenTopology>,
    pub activation_slot: Option<u64>,
    pub incomplete_reason: Option<String>,
    pub epoch: u64,
    pub last_refresh: Option<Instant>,
}

impl LifecycleEntry {
    fn new(pool: Key, slot: u64) -> Self {
        Self {
            pool,
            state: LifecycleState::Discovered,
            discovery_slot: slot,
            discovered_at: Instant::now(),
            frozen_topology: None,
            activation_slot: None,
            incomplete_reason: None,
            epoch: 0,
            last_refresh: None,
        }
    }
}

/// Owns the lifecycle state for every known pool plus the vault/fee-config
/// -> pool reverse maps used to gate bootstrap writes. Never holds cache
/// entries or shared ownership of them — only plain keys (spec §9).
#[derive(Debug)]
pub struct LifecycleRegistry {
    entries: HashMap<Key, LifecycleEntry>,
    vault_to_pool: HashMap<Key, Key>,
    fee_config_to_pool: HashMap<Key, Key>,
    min_refresh_interval: Duration,
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_MIN_REFRESH_INTERVAL_MS))
    }
}

impl LifecycleRegistry {
    pub fn new(min_refresh_interval: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            vault_to_pool: HashMap::new(),
            fee_config_to_pool: HashMap::new(),
            min_refresh_interval,
        }
    }

    pub fn get(&self, pool: &Key) -> Option<&LifecycleEntry> {
        self.entries.get(pool)
    }

    pub fn state(&self, pool: &Key) -> Option<LifecycleState> {
        self.entries.get(pool).map(|e| e.state)
    }

    /// `(unknown) -> DISCOVERED`. A no-op if the pool is already known.
    pub fn discover_pool(&mut self, pool: Key, slot: u64) -> &LifecycleEntry {
        self.entries
            .entry(pool)
            .or_insert_with(|| LifecycleEntry::new(pool, slot))
    }

    /// `DISCOVERED -> TOPOLOGY_FROZEN`, or `REFRESHING -> TOPOLOGY_FROZEN`
    /// (incrementing epoch) per the transition diagram.
    pub fn freeze_topology(
        &mut self,
        pool: Key,
        topology: FrozenTopology,
        slot: u64,
    ) -> Result<(), LifecycleError> {
        let entry = self.entries.get_mut(&pool).ok_or(LifecycleError::UnknownPool(pool))?;
        match entry.state {
            LifecycleState::Discovered => {
                entry.state = LifecycleState::TopologyFrozen;
            }
            LifecycleState::Refreshing => {
                entry.state = LifecycleState::TopologyFrozen;
                entry.epoch += 1;
            }
            other => return Err(LifecycleError::InvalidTransition(other.label(), "topology_frozen")),
        }
        entry.discovery_slot = entry.discovery_slot.max(slot);
        entry.incomplete_reason = None;

        self.vault_to_pool.insert(topology.base_vault, pool);
        self.vault_to_pool.insert(topology.quote_vault, pool);
        if let Some(fee_config) = topology.fee_config {
            self.fee_config_to_pool.insert(fee_config, pool);
        }
        self.entries.get_mut(&pool).unwrap().frozen_topology = Some(topology);
        Ok(())
    }

    /// `TOPOLOGY_FROZEN -> ACTIVE`.
    pub fn activate(&mut self, pool: Key, slot: u64) -> Result<(), LifecycleError> {
        let entry = self.entries.get_mut(&pool).ok_or(LifecycleError::UnknownPool(pool))?;
        match entry.state {
            LifecycleState::TopologyFrozen => {
                entry.state = LifecycleState::Active;
                entry.activation_slot = Some(slot);
                Ok(())
            }
            other => Err(LifecycleError::InvalidTransition(other.label(), "active")),
        }
    }

    /// Annotates a `TOPOLOGY_FROZEN` pool with why it cannot yet activate.
    /// Does not change state (spec §4.3).
    pub fn mark_incomplete(&mut self, pool: Key, reason: impl Into<String>) -> Result<(), LifecycleError> {
        let entry = self.entries.get_mut(&pool).ok_or(LifecycleError::UnknownPool(pool))?;
        if entry.state != LifecycleState::TopologyFrozen {
            return Err(LifecycleError::InvalidTransition(entry.state.label(), "topology_frozen"));
        }
        entry.incomplete_reason = Some(reason.into());
        Ok(())
    }

    /// `ACTIVE -> REFRESHING`, rate-limited to at most once per
    /// `min_refresh_interval`.
    pub fn start_refresh(
        &mut self,
        pool: Key,
        _slot: u64,
        _reason: impl Into<String>,
        min_interval_override_ms: Option<u64>,
    ) -> Result<(), LifecycleError> {
        let entry = self.entries.get_mut(&pool).ok_or(LifecycleError::UnknownPool(pool))?;
        if entry.state != LifecycleState::Active {
            return Err(LifecycleError::InvalidTransition(entry.state.label(), "refreshing"));
        }
        let min_interval = min_interval_override_ms
            .map(Duration::from_millis)
            .unwrap_or(self.min_refresh_interval);
        if let Some(last) = entry.last_refresh {
            if last.elapsed() < min_interval {
                return Err(LifecycleError::RateLimited);
            }
        }
        entry.state = LifecycleState::Refreshing;
        entry.last_refresh = Some(Instant::now());
        Ok(())
    }

    /// `REFRESHING -> ACTIVE`, topology left untouched (spec §9, "Refresh
    /// idempotence") — used when a bootstrap fetch fails mid-refresh.
    pub fn abort_refresh(&mut self, pool: Key, _slot: u64) -> Result<(), LifecycleError> {
        let entry = self.entries.get_mut(&pool).ok_or(LifecycleError::UnknownPool(pool))?;
        if entry.state != LifecycleState::Refreshing {
            return Err(LifecycleError::InvalidTransition(entry.state.label(), "active"));
        }
        entry.state = LifecycleState::Active;
        Ok(())
    }

    /// `ACTIVE | TOPOLOGY_FROZEN -> DISCOVERED`. Clears topology and reverse
    /// mappings; epoch is preserved.
    pub fn deactivate(&mut self, pool: Key, _slot: u64, _reason: impl Into<String>) -> Result<(), LifecycleError> {
        let entry = self.entries.get_mut(&pool).ok_or(LifecycleError::UnknownPool(pool))?;
        if !matches!(entry.state, LifecycleState::Active | LifecycleState::TopologyFrozen) {
            return Err(LifecycleError::InvalidTransition(entry.state.label(), "discovered"));
        }
        if let Some(topology) = entry.frozen_topology.take() {
            self.vault_to_pool.remove(&topology.base_vault);
            self.vault_to_pool.remove(&topology.quote_vault);
            if let Some(fee_config) = topology.fee_config {
                self.fee_config_to_pool.remove(&fee_config);
            }
        }
        entry.state = LifecycleState::Discovered;
        entry.activation_slot = None;
        entry.incomplete_reason = None;
        Ok(())
    }

    pub fn owning_pool_for_vault(&self, vault: &Key) -> Option<Key> {
        self.vault_to_pool.get(vault).copied()
    }

    pub fn owning_pool_for_fee_config(&self, fee_config: &Key) -> Option<Key> {
        self.fee_config_to_pool.get(fee_config).copied()
    }

    /// Spec §4.3: "Unknown for any key" and `DISCOVERED`/`REFRESHING` allow
    /// bootstrap writes; `TOPOLOGY_FROZEN`/`ACTIVE` do not.
    fn rpc_allowed_for_state(state: Option<LifecycleState>) -> bool {
        match state {
            None => true,
            Some(LifecycleState::Discovered) | Some(LifecycleState::Refreshing) => true,
            Some(LifecycleState::TopologyFrozen) | Some(LifecycleState::Active) => false,
        }
    }

    pub fn rpc_allowed_for_pool(&self, pool: &Key) -> bool {
        Self::rpc_allowed_for_state(self.state(pool))
    }

    pub fn rpc_allowed_for_vault(&self, vault: &Key) -> bool {
        match self.owning_pool_for_vault(vault) {
            Some(pool) => self.rpc_allowed_for_pool(&pool),
            None => true,
        }
    }

    pub fn rpc_allowed_for_fee_config(&self, fee_config: &Key) -> bool {
        match self.owning_pool_for_fee_config(fee_config) {
            Some(pool) => self.rpc_allowed_for_pool(&pool),
            None => true,
        }
    }

    /// `ACTIVE` or `REFRESHING` pools protect their dependencies from
    /// eviction (spec §3, "Invariants").
    pub fn is_protected(&self, pool: &Key) -> bool {
        matches!(
            self.state(pool),
            Some(LifecycleState::Active) | Some(LifecycleState::Refreshing)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(pool: Key) -> FrozenTopology {
        FrozenTopology {
            pool,
            venue: arb_types::Venue::CpmmExplicitFee,
            base_vault: Key::new([10; 32]),
            quote_vault: Key::new([11; 32]),
            tick_arrays: vec![],
            bin_arrays: vec![],
            fee_config: None,
            freeze_slot: 100,
        }
    }

    #[test]
    fn unknown_pool_allows_bootstrap_writes() {
        let registry = LifecycleRegistry::default();
        assert!(registry.rpc_allowed_for_pool(&Key::new([1; 32])));
    }

    #[test]
    fn frozen_and_active_pools_block_bootstrap_writes() {
        let mut registry = LifecycleRegistry::default();
        let pool = Key::new([1; 32]);
        registry.discover_pool(pool, 10);
        assert!(registry.rpc_allowed_for_pool(&pool));

        registry.freeze_topology(pool, topology(pool), 20).unwrap();
        assert!(!registry.rpc_allowed_for_pool(&pool));
        assert!(!registry.rpc_allowed_for_vault(&Key::new([10; 32])));

        registry.activate(pool, 20).unwrap();
        assert!(!registry.rpc_allowed_for_pool(&pool));
    }

    #[test]
    fn active_and_refreshing_pools_are_protected_from_eviction() {
        let mut registry = LifecycleRegistry::default();
        let pool = Key::new([1; 32]);
        registry.discover_pool(pool, 10);
        assert!(!registry.is_protected(&pool));
        registry.freeze_topology(pool, topology(pool), 20).unwrap();
        registry.activate(pool, 20).unwrap();
        assert!(registry.is_protected(&pool));
    }

    #[test]
    fn deactivate_clears_topology_but_preserves_epoch() {
        let mut registry = LifecycleRegistry::default();
        let pool = Key::new([1; 32]);
        registry.discover_pool(pool, 10);
        registry.freeze_topology(pool, topology(pool), 20).unwrap();
        registry.activate(pool, 20).unwrap();
        registry.deactivate(pool, 30, "manual").unwrap();
        assert_eq!(registry.state(&pool), Some(LifecycleState::Discovered));
        assert!(registry.rpc_allowed_for_vault(&Key::new([10; 32])));
        assert_eq!(registry.get(&pool).unwrap().epoch, 0);
    }

    #[test]
    fn abort_refresh_returns_to_active_with_topology_intact() {
        let mut registry = LifecycleRegistry::new(Duration::from_millis(0));
        let pool = Key::new([1; 32]);
        registry.discover_pool(pool, 10);
        registry.freeze_topology(pool, topology(pool), 20).unwrap();
        registry.activate(pool, 20).unwrap();
        registry.start_refresh(pool, 30, "periodic", None).unwrap();
        assert_eq!(registry.state(&pool), Some(LifecycleState::Refreshing));
        registry.abort_refresh(pool, 31).unwrap();
        assert_eq!(registry.state(&pool), Some(LifecycleState::Active));
        assert!(registry.get(&pool).unwrap().frozen_topology.is_some());
    }

    #[test]
    fn start_refresh_is_rate_limited() {
        let mut registry = LifecycleRegistry::new(Duration::from_secs(5));
        let pool = Key::new([1; 32]);
        registry.discover_pool(pool, 10);
        registry.freeze_topology(pool, topology(pool), 20).unwrap();
        registry.activate(pool, 20).unwrap();
        registry.start_refresh(pool, 30, "periodic", None).unwrap();
        registry.abort_refresh(pool, 31).unwrap();
        assert_eq!(
            registry.start_refresh(pool, 32, "periodic", None),
            Err(LifecycleError::RateLimited)
        );
    }
}

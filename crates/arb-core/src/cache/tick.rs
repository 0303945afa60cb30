//! Tick cache: keyed by `(pool, start_tick)`. Adds a secondary
//! account-key index, a known-non-existent set backing virtual-zero reads,
//! and topology-aware eviction.

use std::collections::{HashMap, HashSet};

use arb_types::{Key, TICKS_PER_ARRAY};

use crate::entities::{Tick, TickArrayEntry};

use super::{is_newer, CacheStats, SetOutcome};

pub type TickArrayKey = (Key, i32);

/// Result of [`TickCache::get_or_virtual`].
pub enum TickLookup<'a> {
    Cached(&'a TickArrayEntry),
    /// Bootstrap has confirmed this array does not exist on-chain: a
    /// stack-allocated all-uninitialised array stands in for it.
    Virtual(Vec<Tick>),
    Missing,
}

#[derive(Debug, Default)]
pub struct TickCache {
    entries: HashMap<TickArrayKey, TickArrayEntry>,
    /// account_key -> (pool, start_tick), diagnostic lookup only.
    account_index: HashMap<Key, TickArrayKey>,
    known_non_existent: HashSet<TickArrayKey>,
    stats: CacheStats,
}

impl TickCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &TickArrayKey) -> Option<&TickArrayEntry> {
        let hit = self.entries.contains_key(key);
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.entries.get(key)
    }

    pub fn peek(&self, key: &TickArrayKey) -> Option<&TickArrayEntry> {
        self.entries.get(key)
    }

    pub fn lookup_by_account(&self, account_key: &Key) -> Option<&TickArrayKey> {
        self.account_index.get(account_key)
    }

    pub fn mark_non_existent(&mut self, pool: Key, start_tick: i32) {
        self.known_non_existent.insert((pool, start_tick));
    }

    /// Returns the cached entry, a synthetic zero-liquidity array for a
    /// confirmed-empty key, or `Missing` — never fabricates data for a key
    /// that has not actually been observed.
    pub fn get_or_virtual(&mut self, pool: Key, start_tick: i32) -> TickLookup<'_> {
        let key = (pool, start_tick);
        if self.entries.contains_key(&key) {
            self.stats.hits += 1;
            return TickLookup::Cached(&self.entries[&key]);
        }
        self.stats.misses += 1;
        if self.known_non_existent.contains(&key) {
            TickLookup::Virtual(vec![Tick::default(); TICKS_PER_ARRAY])
        } else {
            TickLookup::Missing
        }
    }

    pub fn set(&mut self, entry: TickArrayEntry) -> SetOutcome {
        if entry.ticks.len() < TICKS_PER_ARRAY {
            return SetOutcome::Invalid;
        }
        let key = (entry.pool, entry.start_tick);
        match self.entries.get(&key) {
            Some(existing) if !is_newer(existing.slot, existing.write_sequence, entry.slot, entry.write_sequence) => {
                return SetOutcome::Stale;
            }
            _ => {}
        }
        self.known_non_existent.remove(&key);
        self.account_index.insert(entry.account_key, key);
        self.stats.last_applied_slot = self.stats.last_applied_slot.max(entry.slot);
        self.entries.insert(key, entry);
        self.stats.size = self.entries.len();
        SetOutcome::Applied
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            ..self.stats
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// If `len() > ceiling`, evicts the oldest (lowest-slot) entry whose
    /// owning pool fails `is_protected`. Never evicts below the ceiling if
    /// every candidate is protected — size is allowed to exceed the
    /// nominal ceiling rather than violate the active-pool guarantee.
    pub fn evict_if_over(&mut self, ceiling: usize, is_protected: impl Fn(Key) -> bool) -> Option<TickArrayKey> {
        if self.entries.len() <= ceiling {
            return None;
        }
        let victim = self
            .entries
            .values()
            .filter(|e| !is_protected(e.pool))
            .min_by_key(|e| e.slot)
            .map(|e| (e.pool, e.start_tick));

        if let Some(key) = victim {
            if let Some(removed) = self.entries.remove(&key) {
                self.account_index.remove(&removed.account_key);
            }
            self.stats.size = self.entries.len();
            self.stats.evictions += 1;
        }
        victim
    }
}

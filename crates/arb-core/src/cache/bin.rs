//! Bin cache: structurally identical to [`super::tick::TickCache`]
//! with `(pool, array_index)` keys and a 70-bin virtual-zero array.

use std::collections::{HashMap, HashSet};

use arb_types::{BINS_PER_ARRAY, Key};

use crate::entities::{Bin, BinArrayEntry};

use super::{is_newer, CacheStats, SetOutcome};

pub type BinArrayKey = (Key, i32);

pub enum BinLookup<'a> {
    Cached(&'a BinArrayEntry),
    Virtual(Vec<Bin>),
    Missing,
}

#[derive(Debug, Default)]
pub struct BinCache {
    entries: HashMap<BinArrayKey, BinArrayEntry>,
    account_index: HashMap<Key, BinArrayKey>,
    known_non_existent: HashSet<BinArrayKey>,
    stats: CacheStats,
}

impl BinCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &BinArrayKey) -> Option<&BinArrayEntry> {
        let hit = self.entries.contains_key(key);
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.entries.get(key)
    }

    pub fn peek(&self, key: &BinArrayKey) -> Option<&BinArrayEntry> {
        self.entries.get(key)
    }

    pub fn lookup_by_account(&self, account_key: &Key) -> Option<&BinArrayKey> {
        self.account_index.get(account_key)
    }

    pub fn mark_non_existent(&mut self, pool: Key, array_index: i32) {
        self.known_non_existent.insert((pool, array_index));
    }

    pub fn get_or_virtual(&mut self, pool: Key, array_index: i32) -> BinLookup<'_> {
        let key = (pool, array_index);
        if self.entries.contains_key(&key) {
            self.stats.hits += 1;
            return BinLookup::Cached(&self.entries[&key]);
        }
        self.stats.misses += 1;
        if self.known_non_existent.contains(&key) {
            BinLookup::Virtual(vec![Bin::default(); BINS_PER_ARRAY])
        } else {
            BinLookup::Missing
        }
    }

    pub fn set(&mut self, entry: BinArrayEntry) -> SetOutcome {
        if entry.bins.len() < BINS_PER_ARRAY {
            return SetOutcome::Invalid;
        }
        let key = (entry.pool, entry.array_index);
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

    pub fn evict_if_over(&mut self, ceiling: usize, is_protected: impl Fn(Key) -> bool) -> Option<BinArrayKey> {
        if self.entries.len() <= ceiling {
            return None;
        }
        let victim = self
            .entries
            .values()
            .filter(|e| !is_protected(e.pool))
            .min_by_key(|e| e.slot)
            .map(|e| (e.pool, e.array_index));

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

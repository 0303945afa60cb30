//! Singleton-config cache: the shared constant-product fee account read by
//! `CpmmSharedFee` pools. Staleness-only, no eviction.

use std::collections::HashMap;

use arb_types::Key;

use crate::entities::SingletonConfigEntry;

use super::{is_newer, CacheStats, SetOutcome};

#[derive(Debug, Default)]
pub struct SingletonConfigCache {
    entries: HashMap<Key, SingletonConfigEntry>,
    stats: CacheStats,
}

impl SingletonConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &Key) -> Option<&SingletonConfigEntry> {
        let hit = self.entries.contains_key(key);
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.entries.get(key)
    }

    pub fn peek(&self, key: &Key) -> Option<&SingletonConfigEntry> {
        self.entries.get(key)
    }

    pub fn set(&mut self, entry: SingletonConfigEntry) -> SetOutcome {
        match self.entries.get(&entry.key) {
            Some(existing) if !is_newer(existing.slot, existing.write_sequence, entry.slot, entry.write_sequence) => {
                SetOutcome::Stale
            }
            _ => {
                self.stats.last_applied_slot = self.stats.last_applied_slot.max(entry.slot);
                self.entries.insert(entry.key, entry);
                self.stats.size = self.entries.len();
                SetOutcome::Applied
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            ..self.stats
        }
    }
}

//! Venue-config cache: CLMM fee tiers / DLMM fee tables, keyed by the
//! fee-config account a pool points at. Staleness-only, no eviction.

use std::collections::HashMap;

use arb_types::Key;

use crate::entities::VenueConfigEntry;

use super::{is_newer, CacheStats, SetOutcome};

#[derive(Debug, Default)]
pub struct VenueConfigCache {
    entries: HashMap<Key, VenueConfigEntry>,
    stats: CacheStats,
}

impl VenueConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &Key) -> Option<&VenueConfigEntry> {
        let hit = self.entries.contains_key(key);
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.entries.get(key)
    }

    pub fn peek(&self, key: &Key) -> Option<&VenueConfigEntry> {
        self.entries.get(key)
    }

    pub fn set(&mut self, entry: VenueConfigEntry) -> SetOutcome {
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

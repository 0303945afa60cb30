//! Pool cache: venue-discriminated pool records, no eviction.

use std::collections::HashMap;

use arb_types::Key;

use crate::entities::PoolEntry;

use super::{is_newer, CacheStats, SetOutcome};

#[derive(Debug, Default)]
pub struct PoolCache {
    entries: HashMap<Key, PoolEntry>,
    stats: CacheStats,
}

impl PoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &Key) -> Option<&PoolEntry> {
        let hit = self.entries.contains_key(key);
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.entries.get(key)
    }

    /// Peeks without affecting hit/miss counters — used internally by the
    /// lifecycle and topology layers, which have their own accounting.
    pub fn peek(&self, key: &Key) -> Option<&PoolEntry> {
        self.entries.get(key)
    }

    pub fn set(&mut self, entry: PoolEntry) -> SetOutcome {
        match self.entries.get(&entry.key) {
            Some(existing) if !is_newer(existing.slot, existing.write_sequence, entry.slot, entry.write_sequence) => {
                SetOutcome::Stale
            }
            _ => {
                self.stats.last_applied_slot = self.stats.last_applied_slot.max(entry.slot);
                let key = entry.key;
                self.entries.insert(key, entry);
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

#[cfg(test)]
mod tests {
    use arb_types::Source;

    use super::*;
    use crate::entities::VenueState;

    fn pool(key: Key, slot: u64, write_sequence: u64) -> PoolEntry {
        PoolEntry {
            key,
            base_mint: Key::ZERO,
            quote_mint: Key::ZERO,
            base_vault: Key::ZERO,
            quote_vault: Key::ZERO,
            slot,
            write_sequence,
            source: Source::Gossip,
            venue: VenueState::CpmmExplicitFee {
                fee_numerator: 30,
                fee_denominator: 10_000,
            },
        }
    }

    #[test]
    fn first_write_applies() {
        let mut cache = PoolCache::new();
        assert_eq!(cache.set(pool(Key::new([1; 32]), 10, 0)), SetOutcome::Applied);
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn equal_slot_and_sequence_is_stale() {
        let mut cache = PoolCache::new();
        let key = Key::new([1; 32]);
        assert_eq!(cache.set(pool(key, 100, 1)), SetOutcome::Applied);
        assert_eq!(cache.set(pool(key, 100, 1)), SetOutcome::Stale);
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn newer_write_replaces_entry() {
        let mut cache = PoolCache::new();
        let key = Key::new([1; 32]);
        cache.set(pool(key, 100, 0));
        assert_eq!(cache.set(pool(key, 101, 0)), SetOutcome::Applied);
        assert_eq!(cache.get(&key).unwrap().slot, 101);
    }
}

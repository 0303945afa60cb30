//! Canonical commit (spec §4.1): the single mutation entry point for every
//! cache. This module defines the event/outcome/rate-limiter types; the
//! routing itself lives on [`crate::context::ArbCoreContext::commit`] since
//! it needs simultaneous access to the lifecycle registry, every typed
//! cache, and the trace sink (spec §9, "one owning context struct").

use std::collections::HashMap;
use std::time::{Duration, Instant};

use arb_types::{EntityKind, Key, Source};

use crate::entities::{BinArrayEntry, PoolEntry, SingletonConfigEntry, TickArrayEntry, VaultEntry, VenueConfigEntry};

/// A tagged update event (spec §4.1). One variant per cache kind; each
/// carries the fully-typed entry, so `slot`/`write_sequence`/`source` need
/// no separate plumbing here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitEvent {
    Pool(PoolEntry),
    Vault(VaultEntry),
    Tick(TickArrayEntry),
    Bin(BinArrayEntry),
    VenueConfig(VenueConfigEntry),
    SingletonConfig(SingletonConfigEntry),
}

impl CommitEvent {
    pub fn kind(&self) -> EntityKind {
        match self {
            CommitEvent::Pool(_) => EntityKind::Pool,
            CommitEvent::Vault(_) => EntityKind::Vault,
            CommitEvent::Tick(_) => EntityKind::Tick,
            CommitEvent::Bin(_) => EntityKind::Bin,
            CommitEvent::VenueConfig(_) => EntityKind::VenueConfig,
            CommitEvent::SingletonConfig(_) => EntityKind::SingletonConfig,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            CommitEvent::Pool(e) => e.source,
            CommitEvent::Vault(e) => e.source,
            CommitEvent::Tick(e) => e.source,
            CommitEvent::Bin(e) => e.source,
            CommitEvent::VenueConfig(e) => e.source,
            CommitEvent::SingletonConfig(e) => e.source,
        }
    }

    pub fn slot(&self) -> u64 {
        match self {
            CommitEvent::Pool(e) => e.slot,
            CommitEvent::Vault(e) => e.slot,
            CommitEvent::Tick(e) => e.slot,
            CommitEvent::Bin(e) => e.slot,
            CommitEvent::VenueConfig(e) => e.slot,
            CommitEvent::SingletonConfig(e) => e.slot,
        }
    }

    pub fn write_sequence(&self) -> u64 {
        match self {
            CommitEvent::Pool(e) => e.write_sequence,
            CommitEvent::Vault(e) => e.write_sequence,
            CommitEvent::Tick(e) => e.write_sequence,
            CommitEvent::Bin(e) => e.write_sequence,
            CommitEvent::VenueConfig(e) => e.write_sequence,
            CommitEvent::SingletonConfig(e) => e.write_sequence,
        }
    }

    /// The key identifying the event's direct entity. For vault/tick/bin/
    /// fee-config events this is *not* necessarily the owning pool — the
    /// lifecycle registry's reverse maps resolve that separately.
    pub fn key(&self) -> Key {
        match self {
            CommitEvent::Pool(e) => e.key,
            CommitEvent::Vault(e) => e.key,
            CommitEvent::Tick(e) => e.account_key,
            CommitEvent::Bin(e) => e.account_key,
            CommitEvent::VenueConfig(e) => e.key,
            CommitEvent::SingletonConfig(e) => e.key,
        }
    }
}

/// Outcome of a single commit (spec §4.1). Never an `Err` for any of these
/// four — only contract violations (`CoreError::Fatal`) propagate as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Stale,
    RejectedByLifecycle,
    RejectedInvalid,
}

/// Rate-limits the `RejectedByLifecycle` diagnostic (spec §4.1, "emit a
/// rate-limited diagnostic") so a misbehaving bootstrap collaborator
/// retrying against a frozen pool cannot flood the log.
#[derive(Debug)]
pub struct DiagnosticRateLimiter {
    last_warned: HashMap<Key, Instant>,
    interval: Duration,
}

impl DiagnosticRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_warned: HashMap::new(),
            interval,
        }
    }

    /// `true` the first time `key` is seen, or again once `interval` has
    /// elapsed since the last time this returned `true`.
    pub fn should_emit(&mut self, key: Key) -> bool {
        let now = Instant::now();
        match self.last_warned.get(&key) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                self.last_warned.insert(key, now);
                true
            }
        }
    }
}

impl Default for DiagnosticRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

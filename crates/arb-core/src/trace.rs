//! The trace event stream (spec §6, "Trace event stream"). Emission from
//! every cache mutation is synchronous and lossless; the core never blocks
//! on the consumer, so the sender is a bounded channel the caller is
//! expected to drain promptly (a full channel simply drops the oldest
//! pending event rather than stalling the hot path — see
//! [`TraceSink::emit`]).

use std::collections::VecDeque;

use arb_types::{EntityKind, Source};

use crate::cache::SetOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub kind: EntityKind,
    pub key: String,
    pub slot: u64,
    pub write_sequence: u64,
    pub source: Source,
    pub outcome: SetOutcome,
    pub reason: Option<&'static str>,
    pub existing_slot: Option<u64>,
}

/// A bounded in-memory trace buffer. Stands in for the `mpsc::Sender` the
/// full keeper installs (spec §6); kept dependency-free here so `arb-core`
/// has no channel-runtime coupling, matching its "no I/O" stance (§7).
pub struct TraceSink {
    buffer: VecDeque<TraceEvent>,
    capacity: usize,
    dropped: u64,
}

impl TraceSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn emit(&mut self, event: TraceEvent) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
            self.dropped += 1;
        }
        self.buffer.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<TraceEvent> {
        self.buffer.drain(..).collect()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for TraceSink {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> TraceEvent {
        TraceEvent {
            kind: EntityKind::Pool,
            key: "abc".into(),
            slot: 1,
            write_sequence: 1,
            source: Source::Gossip,
            outcome: SetOutcome::Applied,
            reason: None,
            existing_slot: None,
        }
    }

    #[test]
    fn emits_and_drains_in_order() {
        let mut sink = TraceSink::new(4);
        sink.emit(sample_event());
        sink.emit(sample_event());
        assert_eq!(sink.len(), 2);
        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn drops_oldest_when_over_capacity_rather_than_blocking() {
        let mut sink = TraceSink::new(2);
        sink.emit(sample_event());
        sink.emit(sample_event());
        sink.emit(sample_event());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.dropped(), 1);
    }
}

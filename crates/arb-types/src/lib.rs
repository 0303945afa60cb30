//! Shared identifiers, tags and constants for the arbitrage core.
//!
//! Kept deliberately free of logic: every type here is a value type with no
//! behaviour beyond construction, comparison and display. The core crate
//! (`arb-core`) is the only place that interprets them.

pub mod constants;
pub mod key;
pub mod tags;

pub use constants::*;
pub use key::Key;
pub use tags::{Direction, EntityKind, Source, Venue};

//! Closed enumerations used throughout the cache, lifecycle and simulation
//! layers. Pools are modeled as a tagged sum over `Venue` rather than via
//! trait objects so simulation dispatch stays a branch-predictable `match`
//! (see design note in `arb-core::context`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an update originated. Gossip is the canonical, confirmed feed;
/// bootstrap is a best-effort point-in-time RPC fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Gossip,
    Bootstrap,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Gossip => write!(f, "gossip"),
            Source::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

/// Swap direction, normalised so the "quote" side is always the native gas
/// token: `AToB` sells the base asset for quote, `BToA` sells quote for base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    AToB,
    BToA,
}

impl Direction {
    pub fn flipped(self) -> Direction {
        match self {
            Direction::AToB => Direction::BToA,
            Direction::BToA => Direction::AToB,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToB => write!(f, "A->B"),
            Direction::BToA => write!(f, "B->A"),
        }
    }
}

/// The closed set of tracked venue families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Constant-product, fee stored explicitly on the pool account.
    CpmmExplicitFee,
    /// Constant-product, fee read from a shared singleton config account.
    CpmmSharedFee,
    /// Concentrated-liquidity (tick-based).
    Clmm,
    /// Discretised-bin.
    Dlmm,
}

impl Venue {
    pub fn is_constant_product(self) -> bool {
        matches!(self, Venue::CpmmExplicitFee | Venue::CpmmSharedFee)
    }

    pub fn has_tick_arrays(self) -> bool {
        matches!(self, Venue::Clmm)
    }

    pub fn has_bin_arrays(self) -> bool {
        matches!(self, Venue::Dlmm)
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::CpmmExplicitFee => write!(f, "cpmm-a"),
            Venue::CpmmSharedFee => write!(f, "cpmm-b"),
            Venue::Clmm => write!(f, "clmm"),
            Venue::Dlmm => write!(f, "dlmm"),
        }
    }
}

/// What kind of entity a commit event mutates. Drives dispatch in the
/// canonical commit function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Pool,
    Vault,
    Tick,
    Bin,
    VenueConfig,
    SingletonConfig,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Pool => "pool",
            EntityKind::Vault => "vault",
            EntityKind::Tick => "tick",
            EntityKind::Bin => "bin",
            EntityKind::VenueConfig => "venue_config",
            EntityKind::SingletonConfig => "singleton_config",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_flip_is_involutive() {
        assert_eq!(Direction::AToB.flipped().flipped(), Direction::AToB);
    }

    #[test]
    fn venue_predicates() {
        assert!(Venue::CpmmExplicitFee.is_constant_product());
        assert!(Venue::CpmmSharedFee.is_constant_product());
        assert!(!Venue::Clmm.is_constant_product());
        assert!(Venue::Clmm.has_tick_arrays());
        assert!(Venue::Dlmm.has_bin_arrays());
        assert!(!Venue::Clmm.has_bin_arrays());
    }
}

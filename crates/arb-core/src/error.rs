//! Error taxonomy (spec §7). Only contract-enforcement violations — the
//! `Fatal` family — ever surface as `Err`; every other outcome named in §7
//! (staleness, lifecycle-blocked, invalid payload, topology-incomplete,
//! simulation-out-of-range) is a plain value inside `Ok(..)`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("fatal contract violation: {0}")]
    Fatal(#[from] FatalReason),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    #[error("account key is the zero key")]
    ZeroKey,
    #[error("commit event kind does not match its payload shape")]
    KindPayloadMismatch,
    #[error("mandatory metadata key missing from event")]
    MissingMetadataKey,
    #[error("lifecycle transition attempted on unknown pool {0}")]
    UnknownPool(arb_types::Key),
    #[error("invalid lifecycle transition from {from:?} to {to}")]
    InvalidTransition { from: String, to: &'static str },
}

pub type CoreResult<T> = Result<T, CoreError>;

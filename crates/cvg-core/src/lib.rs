//! Cvg core: vote-escrow locking, gauge voting and chunked reward distribution.
//!
//! The engine is a pure, deterministic state machine:
//! - no IO and no clock reads; callers pass `now` (unix seconds) into time-dependent calls
//! - fixed-point `u128` amounts (18 decimals) with 256-bit intermediates and floor division
//! - every public mutation either commits fully or fails with no state change

use thiserror::Error;

pub mod access;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod gauge;
pub mod locking;
pub mod math;
pub mod rewards;
pub mod token;
pub mod types;

pub use config::EngineConfig;
pub use engine::{CvgEngine, GaugeDirectory};
pub use types::{Address, Amount, Bps, Cycle, GaugeId, TokenId};

/// Unified error type for engine operations.
///
/// Variants map one-to-one onto the failure kinds callers need to tell apart:
/// authorization, state preconditions, bound violations, arithmetic and configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CvgError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bounded value exceeded: {0}")]
    BoundedValueExceeded(String),

    // Authorization
    #[error("caller is not the owner")]
    NotOwner,

    #[error("caller does not own token {0}")]
    NotPositionOwner(TokenId),

    #[error("caller is neither owner nor vote delegate of token {0}")]
    NotAllowedToVote(TokenId),

    // Lock ledger
    #[error("position {0} does not exist")]
    PositionNotFound(TokenId),

    #[error("position is timelocked until {until}")]
    PositionTimelocked { until: u64 },

    #[error("amount must be greater than zero")]
    AmountZero,

    #[error("lock duration must be at least one cycle")]
    LockDurationZero,

    #[error("lock would last {cycles} cycles, max is {max}")]
    LockDurationTooLong { cycles: u64, max: u64 },

    #[error("lock end cycle {end} is not a TDE multiple")]
    EndNotTdeMultiple { end: Cycle },

    #[error("ys percentage {0} exceeds 100")]
    YsPercentageOutOfRange(u8),

    #[error("ys percentage {0} is not a multiple of 10")]
    YsPercentageNotMultipleOf10(u8),

    #[error("lock is over")]
    LockOver,

    #[error("remaining lock duration too low")]
    RemainingLockDurationTooLow,

    #[error("added lock duration not enough")]
    AddedLockDurationNotEnough,

    #[error("position is still locked until cycle {last_end_cycle}")]
    StillLocked { last_end_cycle: Cycle },

    // Gauge registry & vote ledger
    #[error("gauge {0} already registered")]
    GaugeAlreadyRegistered(Address),

    #[error("{0} is not a staking contract")]
    NotAStakingContract(Address),

    #[error("gauge {0:?} not found")]
    GaugeNotFound(GaugeId),

    #[error("unknown gauge type {0}")]
    UnknownGaugeType(usize),

    #[error("gauge {0:?} is killed")]
    GaugeKilled(GaugeId),

    #[error("votes on gauge {0:?} are paused")]
    GaugePaused(GaugeId),

    #[error("vote ledger is locked during distribution")]
    VoteLedgerLocked,

    #[error("vote weight {0} exceeds 10000 bps")]
    VoteWeightOutOfRange(u16),

    #[error("used too much power")]
    UsedTooMuchPower,

    #[error("cannot vote so often, next vote allowed at {next_allowed}")]
    VoteTooOften { next_allowed: u64 },

    #[error("lock expires too soon to vote")]
    LockExpiresTooSoon,

    // Reward distributor
    #[error("need to wait 7 days, next distribution at {next_allowed}")]
    NeedWait7Days { next_allowed: u64 },

    #[error("gauge {gauge:?} already processed for cycle {cycle}")]
    CycleAlreadyProcessed { gauge: GaugeId, cycle: Cycle },

    #[error("Invariant violated: {0}")]
    InvariantViolation(&'static str),

    // Configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, CvgError>;

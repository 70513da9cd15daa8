use serde::{Deserialize, Serialize};

use crate::math::{mul3_div_floor, mul_div_floor};
use crate::types::{Address, Amount, Cycle};
use crate::Result;

/// Longest lock, in cycles.
pub const MAX_LOCK: u64 = 96;
/// Cycles between two treasury distribution events; lock ends are aligned on it.
pub const TDE_DURATION: u64 = 12;
pub const MAX_PERCENTAGE: u64 = 100;
pub const YS_PERCENTAGE_STEP: u8 = 10;

/// One mutation of a position, kept so any past balance can be rebuilt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockExtension {
    /// Cycle the record takes effect from.
    pub cycle_id: Cycle,
    pub end_cycle: Cycle,
    /// Amount earning yield-share over `(cycle_id, end_cycle]`.
    pub cvg_locked: Amount,
    pub mg_cvg_added: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPosition {
    pub owner: Address,
    pub start_cycle: Cycle,
    pub last_end_cycle: Cycle,
    pub total_cvg_locked: Amount,
    /// Governance weight: sum of `mg_cvg_added` over all extensions.
    pub mg_cvg_amount: Amount,
    /// Voting slope; voting power decays linearly from it to zero at `last_end_cycle`.
    pub ve_cvg_amount: Amount,
    pub ys_percentage: u8,
    /// Transfers and burns are refused before this timestamp.
    pub unlock_timestamp: u64,
    pub vote_delegate: Option<Address>,
}

/// Parameters of a new lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintPosition {
    pub lock_duration: u64,
    pub amount: Amount,
    pub ys_percentage: u8,
    pub receiver: Address,
    /// Apply the configured mint timelock to the new position.
    #[serde(default)]
    pub with_lock: bool,
}

/// Governance weight earned by locking `amount` for `cycles`:
/// `amount * cycles * (100 - ys) / (100 * MAX_LOCK)`.
pub fn mg_cvg_for(amount: Amount, cycles: u64, ys_percentage: u8) -> Result<Amount> {
    mul3_div_floor(
        amount,
        cycles as u128,
        (MAX_PERCENTAGE - ys_percentage as u64) as u128,
        (MAX_PERCENTAGE * MAX_LOCK) as u128,
    )
}

/// Voting slope of `amount`: its non-yield-share part.
pub fn ve_cvg_for(amount: Amount, ys_percentage: u8) -> Result<Amount> {
    mul_div_floor(
        amount,
        (MAX_PERCENTAGE - ys_percentage as u64) as u128,
        MAX_PERCENTAGE as u128,
    )
}

/// Yield-share weight of one extension at `cycle`.
///
/// Full `ys_total` once the first TDE after `cycle_id` has passed, prorated by the
/// covered part of that first TDE window before. Extensions no longer than one TDE
/// count in full immediately. Callers bound the result by the position's lifetime.
pub fn ys_contribution(ext: &LockExtension, ys_percentage: u8, cycle: Cycle) -> Result<Amount> {
    if ext.cycle_id >= cycle {
        return Ok(0);
    }
    let span = ext.end_cycle.saturating_sub(ext.cycle_id);
    let ys_total = mul3_div_floor(
        ext.cvg_locked,
        span as u128,
        ys_percentage as u128,
        (MAX_PERCENTAGE * MAX_LOCK) as u128,
    )?;
    if span <= TDE_DURATION {
        return Ok(ys_total);
    }
    let first_tde = TDE_DURATION * (ext.cycle_id / TDE_DURATION + 1);
    if cycle <= first_tde {
        mul_div_floor(
            ys_total,
            (first_tde - ext.cycle_id) as u128,
            TDE_DURATION as u128,
        )
    } else {
        Ok(ys_total)
    }
}

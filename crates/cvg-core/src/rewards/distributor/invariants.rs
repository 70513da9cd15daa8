//! Invariant checker for the distributor.

use super::state::{Phase, State};
use crate::{CvgError, Result};

/// Check all invariants against the active gauge count and vote-ledger lock.
pub fn check_invariants(state: &State, n_active: usize, ledger_locked: bool) -> Result<()> {
    // CursorInRange
    if state.cursor > n_active {
        return Err(CvgError::InvariantViolation("CursorInRange"));
    }

    // SyncHasNoCursor
    if state.phase == Phase::Sync && state.cursor != 0 {
        return Err(CvgError::InvariantViolation("SyncHasNoCursor"));
    }

    // LedgerLockedIffInFlight
    if ledger_locked != state.in_flight() {
        return Err(CvgError::InvariantViolation("LedgerLockedIffInFlight"));
    }

    // TotalWeightOnlyWhileSummingOrDistributing
    if matches!(state.phase, Phase::Checkpoint | Phase::Sync) && state.total_weight_locked != 0 {
        return Err(CvgError::InvariantViolation(
            "TotalWeightOnlyWhileSummingOrDistributing",
        ));
    }

    Ok(())
}

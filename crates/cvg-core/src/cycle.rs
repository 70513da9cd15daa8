//! Cycle clock.

use serde::{Deserialize, Serialize};

use crate::types::Cycle;
use crate::{CvgError, Result};

/// First cycle of the protocol.
pub const GENESIS_CYCLE: Cycle = 1;

/// Monotone cycle counter.
///
/// Only the reward distributor's SYNC step may advance it, so `advance` is crate-private.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleClock {
    cycle: Cycle,
}

impl CycleClock {
    pub fn new() -> CycleClock {
        CycleClock {
            cycle: GENESIS_CYCLE,
        }
    }

    pub fn starting_at(cycle: Cycle) -> Result<CycleClock> {
        if cycle < GENESIS_CYCLE {
            return Err(CvgError::InvalidInput("cycle 0 does not exist".into()));
        }
        Ok(CycleClock { cycle })
    }

    pub fn current(&self) -> Cycle {
        self.cycle
    }

    pub(crate) fn advance(&mut self) -> Result<Cycle> {
        self.cycle = self
            .cycle
            .checked_add(1)
            .ok_or_else(|| CvgError::BoundedValueExceeded("cycle overflow".into()))?;
        Ok(self.cycle)
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new()
    }
}

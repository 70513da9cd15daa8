//! Capped staking emission.
//!
//! Gauge rewards are the only minting path modeled here; once the lifetime cap is
//! reached further mints are clamped to what remains.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::Amount;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingEmission {
    cap: Amount,
    minted: Amount,
}

impl StakingEmission {
    pub fn new(cap: Amount) -> StakingEmission {
        StakingEmission { cap, minted: 0 }
    }

    pub fn cap(&self) -> Amount {
        self.cap
    }

    pub fn minted(&self) -> Amount {
        self.minted
    }

    pub fn remaining(&self) -> Amount {
        self.cap.saturating_sub(self.minted)
    }

    /// Mints up to `amount` and returns what was actually minted.
    pub fn mint_staking(&mut self, amount: Amount) -> Amount {
        let remaining = self.remaining();
        let minted = if amount > remaining {
            warn!(requested = amount, remaining, "staking emission cap reached, mint clamped");
            remaining
        } else {
            amount
        };
        self.minted += minted;
        minted
    }
}

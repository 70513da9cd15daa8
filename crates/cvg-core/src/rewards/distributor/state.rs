//! Distributor state.

use serde::{Deserialize, Serialize};

use crate::config::DistributionConfig;
use crate::rewards::ledger::RewardLedger;
use crate::token::StakingEmission;
use crate::types::{Amount, Bps};
use crate::{CvgError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Checkpoint,
    TotalWeight,
    Distribute,
    Sync,
}

/// Progress of the current distribution pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub phase: Phase,
    /// Index into the active gauge list; reset on every phase change.
    pub cursor: usize,
    pub total_weight_locked: u128,
    pub last_distribution_time: u64,
}

impl State {
    pub fn init(genesis_ts: u64) -> Self {
        Self {
            phase: Phase::Checkpoint,
            cursor: 0,
            total_weight_locked: 0,
            last_distribution_time: genesis_ts,
        }
    }

    /// A pass is in flight once the first checkpoint chunk has run.
    pub fn in_flight(&self) -> bool {
        !(self.phase == Phase::Checkpoint && self.cursor == 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSizes {
    pub checkpoint: usize,
    pub total_weight: usize,
    pub distribute: usize,
}

/// Chunked reward distributor: one phase chunk per [`advance`](RewardDistributor::advance).
#[derive(Clone, Debug)]
pub struct RewardDistributor {
    pub(crate) state: State,
    pub(crate) chunks: ChunkSizes,
    pub(crate) interval_secs: u64,
    pub(crate) inflation_ratio: Bps,
    pub(crate) rewards: RewardLedger,
    pub(crate) emission: StakingEmission,
}

impl RewardDistributor {
    pub fn new(config: &DistributionConfig, genesis_ts: u64) -> RewardDistributor {
        RewardDistributor {
            state: State::init(genesis_ts),
            chunks: ChunkSizes {
                checkpoint: config.max_chunk_checkpoint,
                total_weight: config.max_loop_set_total_weight,
                distribute: config.max_chunk_distribute,
            },
            interval_secs: config.distribution_interval_secs,
            inflation_ratio: config.inflation_ratio,
            rewards: RewardLedger::new(),
            emission: StakingEmission::new(config.max_staking_mint),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn chunks(&self) -> ChunkSizes {
        self.chunks
    }

    pub fn inflation_ratio(&self) -> Bps {
        self.inflation_ratio
    }

    pub fn rewards(&self) -> &RewardLedger {
        &self.rewards
    }

    pub fn emission(&self) -> &StakingEmission {
        &self.emission
    }

    /// Earliest timestamp the next pass may start at.
    pub fn next_distribution_time(&self) -> u64 {
        self.state
            .last_distribution_time
            .saturating_add(self.interval_secs)
    }

    pub fn set_chunks(&mut self, chunks: ChunkSizes) -> Result<()> {
        if chunks.checkpoint == 0 || chunks.total_weight == 0 || chunks.distribute == 0 {
            return Err(CvgError::InvalidInput("chunk sizes must be greater than 0".into()));
        }
        self.chunks = chunks;
        Ok(())
    }

    pub fn set_inflation_ratio(&mut self, ratio: Bps) {
        self.inflation_ratio = ratio;
    }

    pub fn minted(&self) -> Amount {
        self.emission.minted()
    }
}

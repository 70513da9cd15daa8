//! Reward side of a cycle: inflation budget, per-gauge reward ledger and the
//! chunked distributor that fills it.

pub mod distributor;
pub mod inflation;
pub mod ledger;

pub use distributor::{Effects, Phase, RewardDistributor};
pub use inflation::staking_inflation_at;
pub use ledger::{CycleReward, RewardLedger};

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Cycle, GaugeId, TokenId};

/// Weight multiplier class shared by a set of gauges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeType {
    pub name: String,
    pub weight: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gauge {
    pub address: Address,
    pub gauge_type: usize,
    /// Irreversible; a killed gauge weighs zero but still accepts vote removals.
    pub killed: bool,
    pub paused: bool,
}

/// Aggregate vote weight of a gauge at the start of a cycle.
///
/// `bias` is the weight itself, `slope` the amount it loses per cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub bias: u128,
    pub slope: u128,
}

impl Point {
    /// Moves the point one cycle forward, dropping `expiring` slope afterwards.
    pub(crate) fn next(self, expiring: u128) -> Point {
        if self.bias > self.slope {
            Point {
                bias: self.bias - self.slope,
                slope: self.slope.saturating_sub(expiring),
            }
        } else {
            Point::default()
        }
    }
}

/// A position's allocation on one gauge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSlope {
    pub slope: Amount,
    /// Share of the position's voting power, in bps.
    pub power: u16,
    pub end: Cycle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeVote {
    pub token: TokenId,
    pub gauge: GaugeId,
    pub weight: u16,
}

/// Staking-contract certification, supplied by the host at construction.
pub trait GaugeDirectory {
    fn is_staking_contract(&self, address: &Address) -> bool;
}

impl GaugeDirectory for std::collections::BTreeSet<Address> {
    fn is_staking_contract(&self, address: &Address) -> bool {
        self.contains(address)
    }
}

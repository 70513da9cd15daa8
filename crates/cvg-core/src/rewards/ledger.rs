use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::add_u128;
use crate::types::{Amount, Cycle, GaugeId};
use crate::{CvgError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReward {
    pub cvg_rewards_amount: Amount,
    pub is_cvg_processed: bool,
}

/// Rewards written to each gauge, per cycle. Entries are write-once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardLedger {
    entries: BTreeMap<(GaugeId, Cycle), CycleReward>,
}

impl RewardLedger {
    pub fn new() -> RewardLedger {
        RewardLedger::default()
    }

    pub fn record(&mut self, gauge: GaugeId, cycle: Cycle, amount: Amount) -> Result<()> {
        let entry = self.entries.entry((gauge, cycle)).or_default();
        if entry.is_cvg_processed {
            return Err(CvgError::CycleAlreadyProcessed { gauge, cycle });
        }
        *entry = CycleReward {
            cvg_rewards_amount: amount,
            is_cvg_processed: true,
        };
        Ok(())
    }

    /// Writes every row for `cycle`, or none if any of them was already written.
    pub fn record_all(&mut self, cycle: Cycle, rows: &[(GaugeId, Amount)]) -> Result<()> {
        for (i, (gauge, _)) in rows.iter().enumerate() {
            let repeated = rows[..i].iter().any(|(g, _)| g == gauge);
            if repeated || self.reward_of(*gauge, cycle).is_cvg_processed {
                return Err(CvgError::CycleAlreadyProcessed {
                    gauge: *gauge,
                    cycle,
                });
            }
        }
        for (gauge, amount) in rows {
            self.entries.insert(
                (*gauge, cycle),
                CycleReward {
                    cvg_rewards_amount: *amount,
                    is_cvg_processed: true,
                },
            );
        }
        Ok(())
    }

    pub fn reward_of(&self, gauge: GaugeId, cycle: Cycle) -> CycleReward {
        self.entries.get(&(gauge, cycle)).copied().unwrap_or_default()
    }

    /// Everything written to `gauge`, oldest cycle first.
    pub fn rewards_of_gauge(&self, gauge: GaugeId) -> impl Iterator<Item = (Cycle, Amount)> + '_ {
        self.entries
            .range((gauge, 0)..=(gauge, Cycle::MAX))
            .map(|((_, cycle), r)| (*cycle, r.cvg_rewards_amount))
    }

    pub fn total_for_cycle(&self, cycle: Cycle) -> Result<Amount> {
        self.entries
            .iter()
            .filter(|((_, c), _)| *c == cycle)
            .try_fold(0u128, |acc, (_, r)| add_u128(acc, r.cvg_rewards_amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_write_for_same_cycle_is_rejected() {
        let mut l = RewardLedger::new();
        let g = GaugeId(3);
        l.record(g, 5, 100).unwrap();
        assert_eq!(
            l.record(g, 5, 1),
            Err(CvgError::CycleAlreadyProcessed { gauge: g, cycle: 5 })
        );
        assert_eq!(l.reward_of(g, 5).cvg_rewards_amount, 100);
        assert!(!l.reward_of(g, 6).is_cvg_processed);

        l.record(g, 6, 50).unwrap();
        l.record(GaugeId(1), 6, 25).unwrap();
        assert_eq!(l.rewards_of_gauge(g).collect::<Vec<_>>(), vec![(5, 100), (6, 50)]);
        assert_eq!(l.total_for_cycle(6).unwrap(), 75);
    }

    #[test]
    fn batch_write_is_all_or_nothing() {
        let mut l = RewardLedger::new();
        let (a, b) = (GaugeId(0), GaugeId(1));
        l.record(b, 4, 10).unwrap();
        assert_eq!(
            l.record_all(4, &[(a, 7), (b, 8)]),
            Err(CvgError::CycleAlreadyProcessed { gauge: b, cycle: 4 })
        );
        assert!(!l.reward_of(a, 4).is_cvg_processed);
        assert_eq!(
            l.record_all(5, &[(a, 1), (a, 2)]),
            Err(CvgError::CycleAlreadyProcessed { gauge: a, cycle: 5 })
        );
        l.record_all(5, &[(a, 1), (b, 2)]).unwrap();
        assert_eq!(l.total_for_cycle(5).unwrap(), 3);
    }
}

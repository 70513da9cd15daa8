//! Step function for the distributor.
//! This is the single chokepoint for every distribution transition.

use tracing::{debug, info, instrument};

use super::invariants::check_invariants;
use super::state::{Phase, RewardDistributor, State};
use crate::cycle::CycleClock;
use crate::gauge::{GaugeController, Point};
use crate::math::{add_u128, mul_div_floor};
use crate::rewards::inflation::staking_inflation_at;
use crate::token::StakingEmission;
use crate::types::{Amount, Cycle, GaugeId};
use crate::{CvgError, Result};

/// Observable result of one `advance` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub phase_before: Phase,
    pub phase_after: Phase,
    /// Gauges handled by this call.
    pub processed: usize,
    /// Rewards written during DISTRIBUTE, as actually minted.
    pub rewards: Vec<(GaugeId, Amount)>,
    /// Set by SYNC.
    pub new_cycle: Option<Cycle>,
}

/// Everything one chunk writes. Sized by the chunk, not by the ledgers.
#[derive(Debug, Default)]
struct Writes {
    points: Vec<(GaugeId, Point)>,
    rewards: Vec<(GaugeId, Amount)>,
    emission: Option<StakingEmission>,
    lock: Option<bool>,
    advance_clock: bool,
}

impl RewardDistributor {
    /// Runs one chunk of the current phase.
    ///
    /// The chunk is computed against the current ledgers without touching them,
    /// the resulting state is checked, and only then are its writes applied.
    #[instrument(skip_all, fields(phase = ?self.state.phase, cursor = self.state.cursor))]
    pub fn advance(
        &mut self,
        gauges: &mut GaugeController,
        clock: &mut CycleClock,
        now: u64,
    ) -> Result<Effects> {
        let n_active = gauges.active_gauges().len();
        check_invariants(&self.state, n_active, gauges.is_locked())?;

        let cycle = clock.current();
        let (next, writes, mut effects) = self.plan(gauges, cycle, now)?;
        check_invariants(&next, n_active, writes.lock.unwrap_or(gauges.is_locked()))?;

        // A chunk has at most one fallible write and it goes first.
        self.rewards.record_all(cycle, &writes.rewards)?;
        if writes.advance_clock {
            clock.advance()?;
        }
        for (id, pt) in writes.points {
            gauges.store_point(id, cycle, pt);
        }
        if let Some(emission) = writes.emission {
            self.emission = emission;
        }
        if let Some(locked) = writes.lock {
            gauges.set_locked(locked);
        }
        self.state = next;
        effects.rewards = writes.rewards;

        if writes.lock == Some(true) {
            info!(cycle, gauges = n_active, "distribution started");
        }
        if let Some(new_cycle) = effects.new_cycle {
            info!(cycle = new_cycle, "cycle advanced");
        }
        debug!(
            phase_before = ?effects.phase_before,
            phase_after = ?effects.phase_after,
            processed = effects.processed,
            cursor = self.state.cursor,
            "distribution chunk done"
        );
        Ok(effects)
    }

    fn plan(
        &self,
        gauges: &GaugeController,
        cycle: Cycle,
        now: u64,
    ) -> Result<(State, Writes, Effects)> {
        let active = gauges.active_gauges();
        let mut next = self.state.clone();
        let mut writes = Writes::default();
        let mut effects = Effects {
            phase_before: next.phase,
            ..Effects::default()
        };

        match next.phase {
            Phase::Checkpoint => {
                if next.cursor == 0 {
                    let next_allowed = self.next_distribution_time();
                    if now < next_allowed {
                        return Err(CvgError::NeedWait7Days { next_allowed });
                    }
                    next.last_distribution_time = now;
                    writes.lock = Some(true);
                }
                let chunk = chunk_of(&next, active, self.chunks.checkpoint);
                for id in chunk {
                    writes.points.push((*id, gauges.projected_point(*id, cycle)?));
                }
                effects.processed = chunk.len();
                finish_chunk(&mut next, chunk.len(), active.len(), Phase::TotalWeight);
            }
            Phase::TotalWeight => {
                let chunk = chunk_of(&next, active, self.chunks.total_weight);
                for id in chunk {
                    next.total_weight_locked = add_u128(
                        next.total_weight_locked,
                        gauges.weighted_gauge_weight_at(*id, cycle)?,
                    )?;
                }
                effects.processed = chunk.len();
                finish_chunk(&mut next, chunk.len(), active.len(), Phase::Distribute);
            }
            Phase::Distribute => {
                let inflation = staking_inflation_at(cycle, self.inflation_ratio)?;
                let total = next.total_weight_locked;
                let chunk = chunk_of(&next, active, self.chunks.distribute);
                let mut emission = self.emission.clone();
                for id in chunk {
                    let reward = if total == 0 {
                        0
                    } else {
                        mul_div_floor(inflation, gauges.weighted_gauge_weight_at(*id, cycle)?, total)?
                    };
                    writes.rewards.push((*id, emission.mint_staking(reward)));
                }
                writes.emission = Some(emission);
                effects.processed = chunk.len();
                if finish_chunk(&mut next, chunk.len(), active.len(), Phase::Sync) {
                    next.total_weight_locked = 0;
                }
            }
            Phase::Sync => {
                let new_cycle = cycle
                    .checked_add(1)
                    .ok_or_else(|| CvgError::BoundedValueExceeded("cycle overflow".into()))?;
                writes.advance_clock = true;
                writes.lock = Some(false);
                next.phase = Phase::Checkpoint;
                next.cursor = 0;
                effects.new_cycle = Some(new_cycle);
            }
        }

        effects.phase_after = next.phase;
        Ok((next, writes, effects))
    }
}

fn chunk_of<'a>(state: &State, active: &'a [GaugeId], size: usize) -> &'a [GaugeId] {
    let start = state.cursor.min(active.len());
    let end = start.saturating_add(size).min(active.len());
    &active[start..end]
}

/// Moves the cursor past `done` gauges; switches to `next` once the list is
/// exhausted. Returns whether the phase changed.
fn finish_chunk(state: &mut State, done: usize, n_active: usize, next: Phase) -> bool {
    state.cursor += done;
    if state.cursor >= n_active {
        state.phase = next;
        state.cursor = 0;
        true
    } else {
        false
    }
}

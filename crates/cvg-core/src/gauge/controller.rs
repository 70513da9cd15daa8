use std::collections::BTreeMap;

use tracing::{debug, info};

use super::types::{Gauge, GaugeDirectory, GaugeType, GaugeVote, Point, VoteSlope};
use crate::config::{BoundsConfig, VotingConfig};
use crate::locking::{LockingLedger, MAX_LOCK};
use crate::math::{add_u128, mul_div_floor, mul_u128};
use crate::types::{Address, Amount, Cycle, GaugeId, TokenId, BPS_U128, BPS_U16, WAD};
use crate::{CvgError, Result};

/// Gauge registry and cycle-indexed vote ledger.
///
/// A vote cast during cycle `c` takes effect from `c + 1` and decays linearly to
/// zero at the position's lock end. Each gauge keeps a sparse point history plus
/// the slope expiring at every future cycle; reads project forward from the last
/// stored point, writes ([`checkpoint_gauge`](Self::checkpoint_gauge)) store it.
#[derive(Clone, Debug)]
pub struct GaugeController {
    vote_cooldown_secs: u64,
    max_gauges: usize,
    /// Set while a distribution pass is in flight.
    locked: bool,
    types: Vec<GaugeType>,
    gauges: Vec<Gauge>,
    by_address: BTreeMap<Address, GaugeId>,
    active: Vec<GaugeId>,
    points: Vec<BTreeMap<Cycle, Point>>,
    changes: Vec<BTreeMap<Cycle, u128>>,
    vote_slopes: BTreeMap<(TokenId, GaugeId), VoteSlope>,
    used_power: BTreeMap<TokenId, u16>,
    last_vote: BTreeMap<(TokenId, GaugeId), u64>,
}

impl GaugeController {
    pub fn new(voting: &VotingConfig, bounds: &BoundsConfig) -> GaugeController {
        GaugeController {
            vote_cooldown_secs: voting.vote_cooldown_secs,
            max_gauges: bounds.max_gauges,
            locked: false,
            types: Vec::new(),
            gauges: Vec::new(),
            by_address: BTreeMap::new(),
            active: Vec::new(),
            points: Vec::new(),
            changes: Vec::new(),
            vote_slopes: BTreeMap::new(),
            used_power: BTreeMap::new(),
            last_vote: BTreeMap::new(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(CvgError::VoteLedgerLocked);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------

    pub fn add_type(&mut self, name: &str, weight: u128) -> Result<usize> {
        self.ensure_unlocked()?;
        self.types.push(GaugeType {
            name: name.to_string(),
            weight,
        });
        let id = self.types.len() - 1;
        info!(gauge_type = id, name, weight, "gauge type added");
        Ok(id)
    }

    pub fn change_type_weight(&mut self, gauge_type: usize, weight: u128) -> Result<()> {
        self.ensure_unlocked()?;
        let t = self
            .types
            .get_mut(gauge_type)
            .ok_or(CvgError::UnknownGaugeType(gauge_type))?;
        t.weight = weight;
        info!(gauge_type, weight, "gauge type weight changed");
        Ok(())
    }

    pub fn gauge_type(&self, gauge_type: usize) -> Result<&GaugeType> {
        self.types
            .get(gauge_type)
            .ok_or(CvgError::UnknownGaugeType(gauge_type))
    }

    /// Registers a staking contract as gauge. `initial_weight` is a permanent
    /// bias counted from the next cycle.
    pub fn add_gauge(
        &mut self,
        address: Address,
        gauge_type: usize,
        initial_weight: u128,
        cycle: Cycle,
        directory: &dyn GaugeDirectory,
    ) -> Result<GaugeId> {
        self.ensure_unlocked()?;
        if self.by_address.contains_key(&address) {
            return Err(CvgError::GaugeAlreadyRegistered(address));
        }
        self.gauge_type(gauge_type)?;
        if !directory.is_staking_contract(&address) {
            return Err(CvgError::NotAStakingContract(address));
        }
        if self.gauges.len() >= self.max_gauges {
            return Err(CvgError::BoundedValueExceeded("max gauges exceeded".into()));
        }
        let id = GaugeId(
            u32::try_from(self.gauges.len())
                .map_err(|_| CvgError::BoundedValueExceeded("gauge id overflow".into()))?,
        );
        self.gauges.push(Gauge {
            address,
            gauge_type,
            killed: false,
            paused: false,
        });
        self.by_address.insert(address, id);
        self.active.push(id);
        self.points.push(BTreeMap::from([(
            next_cycle(cycle)?,
            Point {
                bias: initial_weight,
                slope: 0,
            },
        )]));
        self.changes.push(BTreeMap::new());
        info!(gauge = id.0, %address, gauge_type, initial_weight, "gauge added");
        Ok(id)
    }

    /// Zeroes the gauge's weight for good. Killing twice is a no-op.
    pub fn kill_gauge(&mut self, id: GaugeId) -> Result<()> {
        self.ensure_unlocked()?;
        let gauge = self.gauge_mut(id)?;
        if gauge.killed {
            return Ok(());
        }
        gauge.killed = true;
        if let Some(pos) = self.active.iter().position(|g| *g == id) {
            self.active.swap_remove(pos);
        }
        info!(gauge = id.0, "gauge killed");
        Ok(())
    }

    /// Flips the vote pause of a gauge and returns the new state.
    pub fn toggle_vote_pause(&mut self, id: GaugeId) -> Result<bool> {
        self.ensure_unlocked()?;
        let gauge = self.gauge_mut(id)?;
        gauge.paused = !gauge.paused;
        let paused = gauge.paused;
        info!(gauge = id.0, paused, "gauge vote pause toggled");
        Ok(paused)
    }

    pub fn gauge(&self, id: GaugeId) -> Result<&Gauge> {
        self.gauges.get(id.index()).ok_or(CvgError::GaugeNotFound(id))
    }

    fn gauge_mut(&mut self, id: GaugeId) -> Result<&mut Gauge> {
        self.gauges
            .get_mut(id.index())
            .ok_or(CvgError::GaugeNotFound(id))
    }

    pub fn gauge_id(&self, address: &Address) -> Option<GaugeId> {
        self.by_address.get(address).copied()
    }

    pub fn n_gauges(&self) -> usize {
        self.gauges.len()
    }

    /// Gauges the distributor iterates, in iteration order.
    pub fn active_gauges(&self) -> &[GaugeId] {
        &self.active
    }

    // ---------------------------------------------------------------------
    // Votes
    // ---------------------------------------------------------------------

    pub fn vote_of(&self, token: TokenId, gauge: GaugeId) -> Option<&VoteSlope> {
        self.vote_slopes.get(&(token, gauge))
    }

    /// Voting power bps already allocated by `token`.
    pub fn used_power(&self, token: TokenId) -> u16 {
        self.used_power.get(&token).copied().unwrap_or(0)
    }

    pub fn last_vote(&self, token: TokenId, gauge: GaugeId) -> Option<u64> {
        self.last_vote.get(&(token, gauge)).copied()
    }

    /// Allocates `weight` bps of `token`'s voting power to `gauge`.
    ///
    /// Weight 0 removes the allocation and is accepted on killed or paused gauges.
    #[allow(clippy::too_many_arguments)]
    pub fn simple_vote(
        &mut self,
        caller: &Address,
        ledger: &LockingLedger,
        token: TokenId,
        gauge: GaugeId,
        weight: u16,
        cycle: Cycle,
        now: u64,
    ) -> Result<()> {
        let vote = GaugeVote { token, gauge, weight };
        let prior = self.prior_of(token, gauge);
        match self.check_vote(caller, ledger, &vote, cycle, now, prior)? {
            VoteCheck::Unchanged => Ok(()),
            VoteCheck::Apply { slope, end, used } => {
                self.apply_vote(&vote, slope, end, used, cycle, now)
            }
        }
    }

    /// Applies every vote or none of them.
    ///
    /// The whole list is checked against the allocations it would leave behind
    /// before the first vote is written.
    pub fn multi_vote(
        &mut self,
        caller: &Address,
        ledger: &LockingLedger,
        votes: &[GaugeVote],
        cycle: Cycle,
        now: u64,
    ) -> Result<()> {
        let mut power: BTreeMap<(TokenId, GaugeId), u16> = BTreeMap::new();
        let mut used: BTreeMap<TokenId, u16> = BTreeMap::new();
        let mut checked = Vec::with_capacity(votes.len());
        for vote in votes {
            let key = (vote.token, vote.gauge);
            let stored = self.prior_of(vote.token, vote.gauge);
            let prior = Prior {
                power: power.get(&key).copied().unwrap_or(stored.power),
                used: used.get(&vote.token).copied().unwrap_or(stored.used),
                last_vote: if power.contains_key(&key) {
                    Some(now)
                } else {
                    stored.last_vote
                },
            };
            let check = self.check_vote(caller, ledger, vote, cycle, now, prior)?;
            if let VoteCheck::Apply { used: after, .. } = check {
                power.insert(key, vote.weight);
                used.insert(vote.token, after);
            }
            checked.push((vote, check));
        }

        for (vote, check) in checked {
            if let VoteCheck::Apply { slope, end, used } = check {
                self.apply_vote(vote, slope, end, used, cycle, now)?;
            }
        }
        Ok(())
    }

    fn prior_of(&self, token: TokenId, gauge: GaugeId) -> Prior {
        Prior {
            power: self.vote_of(token, gauge).map(|v| v.power).unwrap_or(0),
            used: self.used_power(token),
            last_vote: self.last_vote(token, gauge),
        }
    }

    fn check_vote(
        &self,
        caller: &Address,
        ledger: &LockingLedger,
        vote: &GaugeVote,
        cycle: Cycle,
        now: u64,
        prior: Prior,
    ) -> Result<VoteCheck> {
        self.ensure_unlocked()?;
        let GaugeVote { token, gauge, weight } = *vote;
        if weight > BPS_U16 {
            return Err(CvgError::VoteWeightOutOfRange(weight));
        }
        let pos = ledger.ensure_can_vote(caller, token)?;
        let g = self.gauge(gauge)?;
        let next = next_cycle(cycle)?;
        if weight != 0 {
            if g.killed {
                return Err(CvgError::GaugeKilled(gauge));
            }
            if g.paused {
                return Err(CvgError::GaugePaused(gauge));
            }
            if pos.last_end_cycle <= next {
                return Err(CvgError::LockExpiresTooSoon);
            }
        }

        let used = prior.used.saturating_sub(prior.power) + weight;
        if used > BPS_U16 {
            return Err(CvgError::UsedTooMuchPower);
        }

        if let Some(last) = prior.last_vote {
            let next_allowed = last.saturating_add(self.vote_cooldown_secs);
            if now < next_allowed {
                if weight == prior.power {
                    debug!(%token, gauge = gauge.0, weight, "unchanged re-vote inside cooldown");
                    return Ok(VoteCheck::Unchanged);
                }
                return Err(CvgError::VoteTooOften { next_allowed });
            }
        }

        // A full-power vote weighs exactly the position's voting power.
        let slope = if weight == 0 {
            0
        } else {
            mul_div_floor(
                pos.ve_cvg_amount,
                weight as u128,
                BPS_U128 * MAX_LOCK as u128,
            )?
        };
        Ok(VoteCheck::Apply {
            slope,
            end: pos.last_end_cycle,
            used,
        })
    }

    fn apply_vote(
        &mut self,
        vote: &GaugeVote,
        new_slope: u128,
        end: Cycle,
        used: u16,
        cycle: Cycle,
        now: u64,
    ) -> Result<()> {
        let GaugeVote { token, gauge, weight } = *vote;
        let next = next_cycle(cycle)?;
        let old = self.vote_slopes.get(&(token, gauge)).copied();

        self.checkpoint_gauge(gauge, next)?;
        let idx = gauge.index();
        let mut pt = self.points[idx].get(&next).copied().unwrap_or_default();
        if let Some(old) = old.filter(|v| v.end > next) {
            pt.bias = pt
                .bias
                .saturating_sub(mul_u128(old.slope, (old.end - next) as u128)?);
            pt.slope = pt.slope.saturating_sub(old.slope);
            let changes = &mut self.changes[idx];
            let remaining = changes.get(&old.end).copied().unwrap_or(0).saturating_sub(old.slope);
            if remaining == 0 {
                changes.remove(&old.end);
            } else {
                changes.insert(old.end, remaining);
            }
        }
        if new_slope != 0 {
            pt.bias = add_u128(pt.bias, mul_u128(new_slope, (end - next) as u128)?)?;
            pt.slope = add_u128(pt.slope, new_slope)?;
            let expiring = self.changes[idx].entry(end).or_insert(0);
            *expiring = add_u128(*expiring, new_slope)?;
        }
        self.points[idx].insert(next, pt);

        if weight == 0 {
            self.vote_slopes.remove(&(token, gauge));
        } else {
            self.vote_slopes.insert(
                (token, gauge),
                VoteSlope {
                    slope: new_slope,
                    power: weight,
                    end,
                },
            );
        }
        if used == 0 {
            self.used_power.remove(&token);
        } else {
            self.used_power.insert(token, used);
        }
        self.last_vote.insert((token, gauge), now);
        debug!(%token, gauge = gauge.0, weight, slope = new_slope, end, "vote recorded");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Weights
    // ---------------------------------------------------------------------

    /// Stores the gauge's projected point at `cycle`.
    pub fn checkpoint_gauge(&mut self, id: GaugeId, cycle: Cycle) -> Result<()> {
        let pt = self.projected_point(id, cycle)?;
        self.store_point(id, cycle, pt);
        Ok(())
    }

    /// Point `checkpoint_gauge` would store, without storing it.
    pub(crate) fn projected_point(&self, id: GaugeId, cycle: Cycle) -> Result<Point> {
        self.gauge(id)?;
        Ok(self.point_at(id, cycle))
    }

    pub(crate) fn store_point(&mut self, id: GaugeId, cycle: Cycle, pt: Point) {
        if let Some(points) = self.points.get_mut(id.index()) {
            points.insert(cycle, pt);
        }
    }

    fn point_at(&self, id: GaugeId, cycle: Cycle) -> Point {
        let idx = id.index();
        let (Some(points), Some(changes)) = (self.points.get(idx), self.changes.get(idx)) else {
            return Point::default();
        };
        match points.range(..=cycle).next_back() {
            Some((&from, &pt)) => (from + 1..=cycle)
                .fold(pt, |p, t| p.next(changes.get(&t).copied().unwrap_or(0))),
            None => Point::default(),
        }
    }

    /// Vote weight of a gauge at `cycle`, zero once killed.
    pub fn gauge_weight_at(&self, id: GaugeId, cycle: Cycle) -> Result<u128> {
        if self.gauge(id)?.killed {
            return Ok(0);
        }
        Ok(self.point_at(id, cycle).bias)
    }

    /// Gauge weight multiplied by its type weight.
    pub fn weighted_gauge_weight_at(&self, id: GaugeId, cycle: Cycle) -> Result<u128> {
        let type_weight = self.gauge_type(self.gauge(id)?.gauge_type)?.weight;
        mul_u128(self.gauge_weight_at(id, cycle)?, type_weight)
    }

    pub fn total_weight_at(&self, cycle: Cycle) -> Result<u128> {
        self.active.iter().try_fold(0u128, |acc, id| {
            add_u128(acc, self.weighted_gauge_weight_at(*id, cycle)?)
        })
    }

    /// Share of the total weight held by `id` at `cycle`, scaled to 1e18.
    pub fn gauge_relative_weight(&self, id: GaugeId, cycle: Cycle) -> Result<Amount> {
        let total = self.total_weight_at(cycle)?;
        if total == 0 {
            return Ok(0);
        }
        mul_div_floor(self.weighted_gauge_weight_at(id, cycle)?, WAD, total)
    }

    /// Checkpoints `id` up to `cycle`, then returns its relative weight.
    pub fn gauge_relative_weight_write(&mut self, id: GaugeId, cycle: Cycle) -> Result<Amount> {
        self.checkpoint_gauge(id, cycle)?;
        self.gauge_relative_weight(id, cycle)
    }
}

fn next_cycle(cycle: Cycle) -> Result<Cycle> {
    cycle
        .checked_add(1)
        .ok_or_else(|| CvgError::BoundedValueExceeded("cycle overflow".into()))
}

/// Allocation state a vote is checked against.
#[derive(Clone, Copy)]
struct Prior {
    power: u16,
    used: u16,
    last_vote: Option<u64>,
}

#[derive(Clone, Copy)]
enum VoteCheck {
    /// Same weight again inside the cooldown.
    Unchanged,
    Apply { slope: u128, end: Cycle, used: u16 },
}

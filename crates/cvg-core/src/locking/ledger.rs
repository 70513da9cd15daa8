use std::collections::BTreeMap;

use tracing::debug;

use super::types::{
    mg_cvg_for, ve_cvg_for, ys_contribution, LockExtension, LockPosition, MintPosition,
    MAX_LOCK, MAX_PERCENTAGE, TDE_DURATION, YS_PERCENTAGE_STEP,
};
use crate::config::{BoundsConfig, LockingConfig};
use crate::math::{add_u128, mul_div_floor};
use crate::types::{Address, Amount, Cycle, TokenId};
use crate::{CvgError, Result};

/// Lock ledger: positions and the extension history their weights are rebuilt from.
///
/// Historical balances are never stored per cycle; every `*_at` query scans the
/// extension records of the position(s) involved.
#[derive(Clone, Debug)]
pub struct LockingLedger {
    config: LockingConfig,
    max_positions: usize,
    max_extensions_per_position: usize,
    next_token_id: u64,
    positions: BTreeMap<TokenId, LockPosition>,
    extensions: BTreeMap<TokenId, Vec<LockExtension>>,
}

impl LockingLedger {
    pub fn new(config: LockingConfig, bounds: &BoundsConfig) -> LockingLedger {
        LockingLedger {
            config,
            max_positions: bounds.max_positions,
            max_extensions_per_position: bounds.max_extensions_per_position,
            next_token_id: 1,
            positions: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }

    pub fn position(&self, token: TokenId) -> Result<&LockPosition> {
        self.positions
            .get(&token)
            .ok_or(CvgError::PositionNotFound(token))
    }

    pub fn extensions(&self, token: TokenId) -> &[LockExtension] {
        self.extensions
            .get(&token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn positions(&self) -> impl Iterator<Item = (TokenId, &LockPosition)> + '_ {
        self.positions.iter().map(|(id, p)| (*id, p))
    }

    pub fn tokens_of(&self, owner: &Address) -> Vec<TokenId> {
        self.positions
            .iter()
            .filter(|(_, p)| p.owner == *owner)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Locks `amount` from `cycle` until `cycle + lock_duration`.
    pub fn mint_position(
        &mut self,
        params: MintPosition,
        cycle: Cycle,
        now: u64,
    ) -> Result<TokenId> {
        if params.amount == 0 {
            return Err(CvgError::AmountZero);
        }
        check_ys_percentage(params.ys_percentage)?;
        if params.lock_duration == 0 {
            return Err(CvgError::LockDurationZero);
        }
        if params.lock_duration > MAX_LOCK {
            return Err(CvgError::LockDurationTooLong {
                cycles: params.lock_duration,
                max: MAX_LOCK,
            });
        }
        let end = cycle
            .checked_add(params.lock_duration)
            .ok_or_else(|| CvgError::BoundedValueExceeded("cycle overflow".into()))?;
        if end % TDE_DURATION != 0 {
            return Err(CvgError::EndNotTdeMultiple { end });
        }
        if self.positions.len() >= self.max_positions {
            return Err(CvgError::BoundedValueExceeded(
                "max positions exceeded".into(),
            ));
        }

        let mg = mg_cvg_for(params.amount, params.lock_duration, params.ys_percentage)?;
        let ve = ve_cvg_for(params.amount, params.ys_percentage)?;
        let unlock_timestamp = if params.with_lock {
            now.saturating_add(self.config.mint_timelock_secs)
        } else {
            0
        };

        let token = TokenId(self.next_token_id);
        self.next_token_id += 1;
        self.positions.insert(
            token,
            LockPosition {
                owner: params.receiver,
                start_cycle: cycle,
                last_end_cycle: end,
                total_cvg_locked: params.amount,
                mg_cvg_amount: mg,
                ve_cvg_amount: ve,
                ys_percentage: params.ys_percentage,
                unlock_timestamp,
                vote_delegate: None,
            },
        );
        self.extensions.insert(
            token,
            vec![LockExtension {
                cycle_id: cycle,
                end_cycle: end,
                cvg_locked: params.amount,
                mg_cvg_added: mg,
            }],
        );
        debug!(%token, owner = %params.receiver, cycle, end, amount = params.amount, "position minted");
        Ok(token)
    }

    /// Adds `amount` to an active lock without moving its end.
    ///
    /// Returns the governance weight added.
    pub fn increase_lock_amount(
        &mut self,
        caller: &Address,
        token: TokenId,
        amount: Amount,
        cycle: Cycle,
    ) -> Result<Amount> {
        let pos = self.owned(caller, token)?;
        if amount == 0 {
            return Err(CvgError::AmountZero);
        }
        if pos.last_end_cycle <= cycle {
            return Err(CvgError::LockOver);
        }
        self.ensure_extension_room(token, 1)?;

        let remaining = pos.last_end_cycle - cycle;
        let mg = mg_cvg_for(amount, remaining, pos.ys_percentage)?;
        let ve = ve_cvg_for(amount, pos.ys_percentage)?;
        let total = add_u128(pos.total_cvg_locked, amount)?;
        let mg_total = add_u128(pos.mg_cvg_amount, mg)?;
        let ve_total = add_u128(pos.ve_cvg_amount, ve)?;
        let ext = LockExtension {
            cycle_id: cycle,
            end_cycle: pos.last_end_cycle,
            cvg_locked: amount,
            mg_cvg_added: mg,
        };

        let pos = self.position_mut(token)?;
        pos.total_cvg_locked = total;
        pos.mg_cvg_amount = mg_total;
        pos.ve_cvg_amount = ve_total;
        self.push_extension(token, vec![ext]);
        debug!(%token, cycle, amount, mg_added = mg, "lock amount increased");
        Ok(mg)
    }

    /// Pushes the end of an active lock `added` cycles further.
    ///
    /// The locked amount earns yield-share for the extension; governance weight is unchanged.
    pub fn increase_lock_time(
        &mut self,
        caller: &Address,
        token: TokenId,
        added: u64,
        cycle: Cycle,
    ) -> Result<()> {
        let pos = self.owned(caller, token)?;
        let new_end = check_time_extension(pos, added, cycle)?;
        self.ensure_extension_room(token, 1)?;

        let ext = LockExtension {
            cycle_id: pos.last_end_cycle,
            end_cycle: new_end,
            cvg_locked: pos.total_cvg_locked,
            mg_cvg_added: 0,
        };
        self.position_mut(token)?.last_end_cycle = new_end;
        self.push_extension(token, vec![ext]);
        debug!(%token, cycle, new_end, "lock time increased");
        Ok(())
    }

    /// Extends the lock and adds `amount` over the whole new remaining duration.
    ///
    /// Returns the governance weight added.
    pub fn increase_lock_time_and_amount(
        &mut self,
        caller: &Address,
        token: TokenId,
        added: u64,
        amount: Amount,
        cycle: Cycle,
    ) -> Result<Amount> {
        let pos = self.owned(caller, token)?;
        if amount == 0 {
            return Err(CvgError::AmountZero);
        }
        let new_end = check_time_extension(pos, added, cycle)?;
        self.ensure_extension_room(token, 2)?;

        let mg = mg_cvg_for(amount, new_end - cycle, pos.ys_percentage)?;
        let ve = ve_cvg_for(amount, pos.ys_percentage)?;
        let total = add_u128(pos.total_cvg_locked, amount)?;
        let mg_total = add_u128(pos.mg_cvg_amount, mg)?;
        let ve_total = add_u128(pos.ve_cvg_amount, ve)?;
        let exts = vec![
            LockExtension {
                cycle_id: pos.last_end_cycle,
                end_cycle: new_end,
                cvg_locked: pos.total_cvg_locked,
                mg_cvg_added: 0,
            },
            LockExtension {
                cycle_id: cycle,
                end_cycle: new_end,
                cvg_locked: amount,
                mg_cvg_added: mg,
            },
        ];

        let pos = self.position_mut(token)?;
        pos.last_end_cycle = new_end;
        pos.total_cvg_locked = total;
        pos.mg_cvg_amount = mg_total;
        pos.ve_cvg_amount = ve_total;
        self.push_extension(token, exts);
        debug!(%token, cycle, new_end, amount, mg_added = mg, "lock time and amount increased");
        Ok(mg)
    }

    /// Removes an expired position and returns its principal.
    pub fn burn_position(
        &mut self,
        caller: &Address,
        token: TokenId,
        cycle: Cycle,
        now: u64,
    ) -> Result<Amount> {
        let pos = self.owned(caller, token)?;
        if pos.last_end_cycle >= cycle {
            return Err(CvgError::StillLocked {
                last_end_cycle: pos.last_end_cycle,
            });
        }
        ensure_not_timelocked(pos, now)?;
        let principal = pos.total_cvg_locked;
        self.positions.remove(&token);
        self.extensions.remove(&token);
        debug!(%token, principal, "position burned");
        Ok(principal)
    }

    /// Sets the transfer timelock of a position, at most `max_timelock_secs` ahead.
    pub fn set_timelock(
        &mut self,
        caller: &Address,
        token: TokenId,
        until: u64,
        now: u64,
    ) -> Result<()> {
        self.owned(caller, token)?;
        if until > now.saturating_add(self.config.max_timelock_secs) {
            return Err(CvgError::InvalidInput(format!(
                "timelock may be at most {}s ahead",
                self.config.max_timelock_secs
            )));
        }
        self.position_mut(token)?.unlock_timestamp = until;
        Ok(())
    }

    /// Moves a position to `to`; the vote delegation does not follow it.
    pub fn transfer_position(
        &mut self,
        caller: &Address,
        token: TokenId,
        to: Address,
        now: u64,
    ) -> Result<()> {
        let pos = self.owned(caller, token)?;
        ensure_not_timelocked(pos, now)?;
        let pos = self.position_mut(token)?;
        pos.owner = to;
        pos.vote_delegate = None;
        Ok(())
    }

    pub fn delegate_votes(
        &mut self,
        caller: &Address,
        token: TokenId,
        delegate: Option<Address>,
    ) -> Result<()> {
        self.owned(caller, token)?;
        self.position_mut(token)?.vote_delegate = delegate;
        Ok(())
    }

    /// Returns the position if `caller` owns it or holds its vote delegation.
    pub fn ensure_can_vote(&self, caller: &Address, token: TokenId) -> Result<&LockPosition> {
        let pos = self.position(token)?;
        if pos.owner == *caller || pos.vote_delegate == Some(*caller) {
            Ok(pos)
        } else {
            Err(CvgError::NotAllowedToVote(token))
        }
    }

    /// Governance weight of `token` at `cycle`.
    pub fn balance_of_mg_cvg_at(&self, token: TokenId, cycle: Cycle) -> Result<Amount> {
        let pos = self.position(token)?;
        if cycle < pos.start_cycle || cycle > pos.last_end_cycle {
            return Ok(0);
        }
        self.extensions(token)
            .iter()
            .filter(|e| e.cycle_id <= cycle)
            .try_fold(0u128, |acc, e| add_u128(acc, e.mg_cvg_added))
    }

    /// Yield-share weight of `token` at `cycle`.
    pub fn balance_of_ys_cvg_at(&self, token: TokenId, cycle: Cycle) -> Result<Amount> {
        let pos = self.position(token)?;
        self.ys_of(token, pos, cycle)
    }

    pub fn total_supply_of_ys_cvg_at(&self, cycle: Cycle) -> Result<Amount> {
        self.positions
            .iter()
            .try_fold(0u128, |acc, (token, pos)| {
                add_u128(acc, self.ys_of(*token, pos, cycle)?)
            })
    }

    pub fn total_supply_of_mg_cvg_at(&self, cycle: Cycle) -> Result<Amount> {
        self.positions.keys().try_fold(0u128, |acc, token| {
            add_u128(acc, self.balance_of_mg_cvg_at(*token, cycle)?)
        })
    }

    /// Voting power at `cycle`, projected from the current lock: `ve * (end - cycle) / MAX_LOCK`.
    pub fn voting_power_at(&self, token: TokenId, cycle: Cycle) -> Result<Amount> {
        let pos = self.position(token)?;
        if cycle >= pos.last_end_cycle {
            return Ok(0);
        }
        mul_div_floor(
            pos.ve_cvg_amount,
            (pos.last_end_cycle - cycle) as u128,
            MAX_LOCK as u128,
        )
    }

    fn ys_of(&self, token: TokenId, pos: &LockPosition, cycle: Cycle) -> Result<Amount> {
        if cycle <= pos.start_cycle || cycle > pos.last_end_cycle {
            return Ok(0);
        }
        self.extensions(token).iter().try_fold(0u128, |acc, e| {
            add_u128(acc, ys_contribution(e, pos.ys_percentage, cycle)?)
        })
    }

    fn owned(&self, caller: &Address, token: TokenId) -> Result<&LockPosition> {
        let pos = self.position(token)?;
        if pos.owner != *caller {
            return Err(CvgError::NotPositionOwner(token));
        }
        Ok(pos)
    }

    fn position_mut(&mut self, token: TokenId) -> Result<&mut LockPosition> {
        self.positions
            .get_mut(&token)
            .ok_or(CvgError::PositionNotFound(token))
    }

    fn ensure_extension_room(&self, token: TokenId, n: usize) -> Result<()> {
        if self.extensions(token).len() + n > self.max_extensions_per_position {
            return Err(CvgError::BoundedValueExceeded(
                "max extensions per position exceeded".into(),
            ));
        }
        Ok(())
    }

    fn push_extension(&mut self, token: TokenId, exts: Vec<LockExtension>) {
        self.extensions.entry(token).or_default().extend(exts);
    }
}

fn check_ys_percentage(ys: u8) -> Result<()> {
    if ys as u64 > MAX_PERCENTAGE {
        return Err(CvgError::YsPercentageOutOfRange(ys));
    }
    if ys % YS_PERCENTAGE_STEP != 0 {
        return Err(CvgError::YsPercentageNotMultipleOf10(ys));
    }
    Ok(())
}

/// Validates a time extension and returns the new end cycle.
fn check_time_extension(pos: &LockPosition, added: u64, cycle: Cycle) -> Result<Cycle> {
    if pos.last_end_cycle <= cycle {
        return Err(CvgError::RemainingLockDurationTooLow);
    }
    if added < TDE_DURATION {
        return Err(CvgError::AddedLockDurationNotEnough);
    }
    let new_end = pos
        .last_end_cycle
        .checked_add(added)
        .ok_or_else(|| CvgError::BoundedValueExceeded("cycle overflow".into()))?;
    if new_end % TDE_DURATION != 0 {
        return Err(CvgError::EndNotTdeMultiple { end: new_end });
    }
    if new_end - cycle > MAX_LOCK {
        return Err(CvgError::LockDurationTooLong {
            cycles: new_end - cycle,
            max: MAX_LOCK,
        });
    }
    Ok(new_end)
}

fn ensure_not_timelocked(pos: &LockPosition, now: u64) -> Result<()> {
    if now < pos.unlock_timestamp {
        return Err(CvgError::PositionTimelocked {
            until: pos.unlock_timestamp,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WAD;
    use proptest::prelude::*;

    fn ledger() -> LockingLedger {
        LockingLedger::new(LockingConfig::default(), &BoundsConfig::default())
    }

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn mint(l: &mut LockingLedger, duration: u64, amount: Amount, ys: u8, cycle: Cycle) -> TokenId {
        l.mint_position(
            MintPosition {
                lock_duration: duration,
                amount,
                ys_percentage: ys,
                receiver: alice(),
                with_lock: false,
            },
            cycle,
            0,
        )
        .unwrap()
    }

    #[test]
    fn mint_then_increase_amount_then_time_and_amount() {
        let mut l = ledger();
        let t = mint(&mut l, 10, 10_000 * WAD, 40, 2);
        assert_eq!(l.balance_of_mg_cvg_at(t, 2).unwrap(), 625 * WAD);

        l.increase_lock_amount(&alice(), t, 10_000 * WAD, 8).unwrap();
        assert_eq!(l.balance_of_mg_cvg_at(t, 8).unwrap(), 875 * WAD);
        // History before the increase is unchanged.
        assert_eq!(l.balance_of_mg_cvg_at(t, 7).unwrap(), 625 * WAD);

        l.increase_lock_time_and_amount(&alice(), t, 48, 10_000 * WAD, 11)
            .unwrap();
        assert_eq!(l.balance_of_mg_cvg_at(t, 11).unwrap(), 3_937_500 * WAD / 1_000);
        let pos = l.position(t).unwrap();
        assert_eq!(pos.last_end_cycle, 60);
        assert_eq!(pos.total_cvg_locked, 30_000 * WAD);
        assert_eq!(pos.mg_cvg_amount, 3_937_500 * WAD / 1_000);
        assert_eq!(l.balance_of_mg_cvg_at(t, 60).unwrap(), 3_937_500 * WAD / 1_000);
        assert_eq!(l.balance_of_mg_cvg_at(t, 61).unwrap(), 0);
        assert_eq!(l.balance_of_mg_cvg_at(t, 1).unwrap(), 0);
    }

    #[test]
    fn ys_balance_tracks_extensions() {
        let mut l = ledger();
        let t = mint(&mut l, 10, 9_600 * WAD, 50, 2);
        // span 10 <= TDE: full 9_600 * 10 * 50 / 9_600 = 500 from the next cycle.
        assert_eq!(l.balance_of_ys_cvg_at(t, 2).unwrap(), 0);
        assert_eq!(l.balance_of_ys_cvg_at(t, 3).unwrap(), 500 * WAD);
        assert_eq!(l.balance_of_ys_cvg_at(t, 12).unwrap(), 500 * WAD);
        assert_eq!(l.balance_of_ys_cvg_at(t, 13).unwrap(), 0);

        l.increase_lock_time(&alice(), t, 24, 5).unwrap();
        // The extension counts only after the old end: 9_600 * 24 * 50 / 9_600 = 1_200.
        assert_eq!(l.balance_of_ys_cvg_at(t, 12).unwrap(), 500 * WAD);
        assert_eq!(l.balance_of_ys_cvg_at(t, 13).unwrap(), 1_700 * WAD);
        assert_eq!(l.balance_of_ys_cvg_at(t, 36).unwrap(), 1_700 * WAD);
        assert_eq!(l.balance_of_ys_cvg_at(t, 37).unwrap(), 0);
        // Time extension does not touch governance weight.
        assert_eq!(l.balance_of_mg_cvg_at(t, 20).unwrap(), l.position(t).unwrap().mg_cvg_amount);
    }

    #[test]
    fn total_supplies_sum_positions() {
        let mut l = ledger();
        let a = mint(&mut l, 10, 9_600 * WAD, 50, 2);
        let b = mint(&mut l, 22, 4_800 * WAD, 100, 2);
        for cycle in 1..30 {
            let ys = l.balance_of_ys_cvg_at(a, cycle).unwrap()
                + l.balance_of_ys_cvg_at(b, cycle).unwrap();
            assert_eq!(l.total_supply_of_ys_cvg_at(cycle).unwrap(), ys);
            let mg = l.balance_of_mg_cvg_at(a, cycle).unwrap()
                + l.balance_of_mg_cvg_at(b, cycle).unwrap();
            assert_eq!(l.total_supply_of_mg_cvg_at(cycle).unwrap(), mg);
        }
    }

    fn params(edit: impl FnOnce(&mut MintPosition)) -> MintPosition {
        let mut p = MintPosition {
            lock_duration: 10,
            amount: WAD,
            ys_percentage: 50,
            receiver: alice(),
            with_lock: false,
        };
        edit(&mut p);
        p
    }

    #[test]
    fn mint_validation() {
        let mut l = ledger();
        assert_eq!(
            l.mint_position(params(|p| p.amount = 0), 2, 0),
            Err(CvgError::AmountZero)
        );
        assert_eq!(
            l.mint_position(params(|p| p.ys_percentage = 110), 2, 0),
            Err(CvgError::YsPercentageOutOfRange(110))
        );
        assert_eq!(
            l.mint_position(params(|p| p.ys_percentage = 55), 2, 0),
            Err(CvgError::YsPercentageNotMultipleOf10(55))
        );
        assert_eq!(
            l.mint_position(params(|p| p.lock_duration = 0), 2, 0),
            Err(CvgError::LockDurationZero)
        );
        assert_eq!(
            l.mint_position(params(|p| p.lock_duration = 108), 0, 0),
            Err(CvgError::LockDurationTooLong { cycles: 108, max: 96 })
        );
        assert_eq!(
            l.mint_position(params(|p| p.lock_duration = 11), 2, 0),
            Err(CvgError::EndNotTdeMultiple { end: 13 })
        );
        assert!(l.is_empty());
    }

    #[test]
    fn time_extension_guards() {
        let mut l = ledger();
        let t = mint(&mut l, 10, WAD, 0, 2);
        assert_eq!(
            l.increase_lock_time(&alice(), t, 6, 3),
            Err(CvgError::AddedLockDurationNotEnough)
        );
        assert_eq!(
            l.increase_lock_time(&alice(), t, 18, 3),
            Err(CvgError::EndNotTdeMultiple { end: 30 })
        );
        assert_eq!(
            l.increase_lock_time(&alice(), t, 96, 3),
            Err(CvgError::LockDurationTooLong { cycles: 105, max: 96 })
        );
        assert_eq!(
            l.increase_lock_time(&alice(), t, 12, 12),
            Err(CvgError::RemainingLockDurationTooLow)
        );
        assert_eq!(
            l.increase_lock_time_and_amount(&alice(), t, 12, WAD, 13),
            Err(CvgError::RemainingLockDurationTooLow)
        );
        assert_eq!(
            l.increase_lock_amount(&alice(), t, WAD, 12),
            Err(CvgError::LockOver)
        );
        let bob = Address::repeat_byte(0xb0);
        assert_eq!(
            l.increase_lock_time(&bob, t, 12, 3),
            Err(CvgError::NotPositionOwner(t))
        );
        assert_eq!(l.extensions(t).len(), 1);
    }

    #[test]
    fn burn_requires_expiry_and_elapsed_timelock() {
        let mut l = ledger();
        let t = l
            .mint_position(
                MintPosition {
                    lock_duration: 10,
                    amount: 7 * WAD,
                    ys_percentage: 0,
                    receiver: alice(),
                    with_lock: true,
                },
                2,
                1_000,
            )
            .unwrap();
        let until = 1_000 + LockingConfig::default().mint_timelock_secs;
        assert_eq!(l.position(t).unwrap().unlock_timestamp, until);
        assert_eq!(
            l.burn_position(&alice(), t, 12, until),
            Err(CvgError::StillLocked { last_end_cycle: 12 })
        );
        assert_eq!(
            l.burn_position(&alice(), t, 13, until - 1),
            Err(CvgError::PositionTimelocked { until })
        );
        assert_eq!(l.burn_position(&alice(), t, 13, until).unwrap(), 7 * WAD);
        assert_eq!(l.position(t), Err(CvgError::PositionNotFound(t)));
        assert!(l.extensions(t).is_empty());
    }

    #[test]
    fn transfer_respects_timelock_and_drops_delegate() {
        let mut l = ledger();
        let bob = Address::repeat_byte(0xb0);
        let carol = Address::repeat_byte(0xc0);
        let t = mint(&mut l, 10, WAD, 0, 2);
        l.delegate_votes(&alice(), t, Some(carol)).unwrap();
        assert!(l.ensure_can_vote(&carol, t).is_ok());
        assert_eq!(
            l.ensure_can_vote(&bob, t),
            Err(CvgError::NotAllowedToVote(t))
        );

        let max = LockingConfig::default().max_timelock_secs;
        assert!(l.set_timelock(&alice(), t, 100 + max + 1, 100).is_err());
        l.set_timelock(&alice(), t, 500, 100).unwrap();
        assert_eq!(
            l.transfer_position(&alice(), t, bob, 499),
            Err(CvgError::PositionTimelocked { until: 500 })
        );
        l.transfer_position(&alice(), t, bob, 500).unwrap();
        assert_eq!(l.position(t).unwrap().owner, bob);
        assert_eq!(l.position(t).unwrap().vote_delegate, None);
        assert_eq!(l.tokens_of(&bob), vec![t]);
    }

    #[test]
    fn voting_power_decays_to_zero_at_lock_end() {
        let mut l = ledger();
        let t = mint(&mut l, 94, 9_600 * WAD, 50, 2);
        // ve = 4_800; at cycle 2 remaining 94 cycles.
        assert_eq!(l.voting_power_at(t, 2).unwrap(), 4_700 * WAD);
        assert_eq!(l.voting_power_at(t, 95).unwrap(), 50 * WAD);
        assert_eq!(l.voting_power_at(t, 96).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn weights_are_monotone_until_expiry(
            start in 1u64..60,
            extra_tdes in 0u64..4,
            amount in 1u128..1_000_000u128,
            ys_step in 0u8..=10,
            bumps in proptest::collection::vec((0u64..48, 1u128..1_000_000u128), 0..4),
        ) {
            let mut l = ledger();
            let ys = ys_step * 10;
            let first_end = (start / TDE_DURATION + 1 + extra_tdes) * TDE_DURATION;
            let t = mint(&mut l, first_end - start, amount * WAD, ys, start);
            for (offset, add) in bumps {
                let cycle = start + offset;
                // Rejections (expired lock) are fine; only accepted mutations matter.
                let _ = l.increase_lock_amount(&alice(), t, add * WAD, cycle);
            }
            let end = l.position(t).unwrap().last_end_cycle;
            for c in start..end {
                prop_assert!(l.balance_of_mg_cvg_at(t, c + 1).unwrap() >= l.balance_of_mg_cvg_at(t, c).unwrap());
                prop_assert!(l.balance_of_ys_cvg_at(t, c + 1).unwrap() >= l.balance_of_ys_cvg_at(t, c).unwrap());
            }
            prop_assert_eq!(l.balance_of_mg_cvg_at(t, end + 1).unwrap(), 0);
            prop_assert_eq!(l.balance_of_ys_cvg_at(t, end + 1).unwrap(), 0);
        }
    }
}

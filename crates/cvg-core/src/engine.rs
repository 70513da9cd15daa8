//! Engine facade.
//!
//! Owns every component, supplies the current cycle to them and gates privileged
//! setters behind the owner. Collaborators (configuration, gauge directory) are
//! passed in at construction.

use tracing::{info, instrument};

use crate::access::Ownable2Step;
use crate::config::EngineConfig;
use crate::cycle::CycleClock;
use crate::gauge::GaugeController;
use crate::locking::{LockingLedger, MintPosition};
use crate::rewards::distributor::{ChunkSizes, Effects, RewardDistributor};
use crate::types::{Address, Amount, Bps, Cycle, GaugeId, TokenId};
use crate::Result;

pub use crate::gauge::{GaugeDirectory, GaugeVote};

pub struct CvgEngine {
    config: EngineConfig,
    owner: Ownable2Step,
    clock: CycleClock,
    locking: LockingLedger,
    gauges: GaugeController,
    distributor: RewardDistributor,
    directory: Box<dyn GaugeDirectory>,
}

impl CvgEngine {
    pub fn new(
        config: EngineConfig,
        owner: Address,
        genesis_ts: u64,
        directory: impl GaugeDirectory + 'static,
    ) -> Result<CvgEngine> {
        config.validate()?;
        let engine = CvgEngine {
            owner: Ownable2Step::new(owner),
            clock: CycleClock::new(),
            locking: LockingLedger::new(config.locking.clone(), &config.bounds),
            gauges: GaugeController::new(&config.voting, &config.bounds),
            distributor: RewardDistributor::new(&config.distribution, genesis_ts),
            directory: Box::new(directory),
            config,
        };
        info!(%owner, genesis_ts, "engine initialized");
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn owner(&self) -> Address {
        self.owner.owner()
    }

    pub fn current_cycle(&self) -> Cycle {
        self.clock.current()
    }

    pub fn locking(&self) -> &LockingLedger {
        &self.locking
    }

    pub fn gauges(&self) -> &GaugeController {
        &self.gauges
    }

    pub fn distributor(&self) -> &RewardDistributor {
        &self.distributor
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.owner.transfer_ownership(caller, new_owner)
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<()> {
        self.owner.accept_ownership(caller)
    }

    // ---------------------------------------------------------------------
    // Lock ledger
    // ---------------------------------------------------------------------

    #[instrument(skip(self, params), fields(receiver = %params.receiver))]
    pub fn mint_position(
        &mut self,
        caller: &Address,
        params: MintPosition,
        now: u64,
    ) -> Result<TokenId> {
        let token = self.locking.mint_position(params, self.clock.current(), now)?;
        info!(%caller, %token, "position minted");
        Ok(token)
    }

    pub fn increase_lock_amount(
        &mut self,
        caller: &Address,
        token: TokenId,
        amount: Amount,
    ) -> Result<Amount> {
        self.locking
            .increase_lock_amount(caller, token, amount, self.clock.current())
    }

    pub fn increase_lock_time(
        &mut self,
        caller: &Address,
        token: TokenId,
        added: u64,
    ) -> Result<()> {
        self.locking
            .increase_lock_time(caller, token, added, self.clock.current())
    }

    pub fn increase_lock_time_and_amount(
        &mut self,
        caller: &Address,
        token: TokenId,
        added: u64,
        amount: Amount,
    ) -> Result<Amount> {
        self.locking.increase_lock_time_and_amount(
            caller,
            token,
            added,
            amount,
            self.clock.current(),
        )
    }

    pub fn burn_position(&mut self, caller: &Address, token: TokenId, now: u64) -> Result<Amount> {
        self.locking
            .burn_position(caller, token, self.clock.current(), now)
    }

    pub fn set_timelock(
        &mut self,
        caller: &Address,
        token: TokenId,
        until: u64,
        now: u64,
    ) -> Result<()> {
        self.locking.set_timelock(caller, token, until, now)
    }

    pub fn transfer_position(
        &mut self,
        caller: &Address,
        token: TokenId,
        to: Address,
        now: u64,
    ) -> Result<()> {
        self.locking.transfer_position(caller, token, to, now)
    }

    pub fn delegate_votes(
        &mut self,
        caller: &Address,
        token: TokenId,
        delegate: Option<Address>,
    ) -> Result<()> {
        self.locking.delegate_votes(caller, token, delegate)
    }

    // ---------------------------------------------------------------------
    // Gauge registry and votes
    // ---------------------------------------------------------------------

    pub fn add_type(&mut self, caller: &Address, name: &str, weight: u128) -> Result<usize> {
        self.owner.ensure_owner(caller)?;
        self.gauges.add_type(name, weight)
    }

    pub fn change_type_weight(
        &mut self,
        caller: &Address,
        gauge_type: usize,
        weight: u128,
    ) -> Result<()> {
        self.owner.ensure_owner(caller)?;
        self.gauges.change_type_weight(gauge_type, weight)
    }

    pub fn add_gauge(
        &mut self,
        caller: &Address,
        address: Address,
        gauge_type: usize,
        initial_weight: u128,
    ) -> Result<GaugeId> {
        self.owner.ensure_owner(caller)?;
        self.gauges.add_gauge(
            address,
            gauge_type,
            initial_weight,
            self.clock.current(),
            self.directory.as_ref(),
        )
    }

    pub fn kill_gauge(&mut self, caller: &Address, gauge: GaugeId) -> Result<()> {
        self.owner.ensure_owner(caller)?;
        self.gauges.kill_gauge(gauge)
    }

    pub fn toggle_vote_pause(&mut self, caller: &Address, gauge: GaugeId) -> Result<bool> {
        self.owner.ensure_owner(caller)?;
        self.gauges.toggle_vote_pause(gauge)
    }

    pub fn simple_vote(
        &mut self,
        caller: &Address,
        token: TokenId,
        gauge: GaugeId,
        weight: u16,
        now: u64,
    ) -> Result<()> {
        self.gauges.simple_vote(
            caller,
            &self.locking,
            token,
            gauge,
            weight,
            self.clock.current(),
            now,
        )
    }

    pub fn multi_vote(&mut self, caller: &Address, votes: &[GaugeVote], now: u64) -> Result<()> {
        self.gauges
            .multi_vote(caller, &self.locking, votes, self.clock.current(), now)
    }

    pub fn gauge_relative_weight_write(&mut self, gauge: GaugeId, cycle: Cycle) -> Result<Amount> {
        self.gauges.gauge_relative_weight_write(gauge, cycle)
    }

    // ---------------------------------------------------------------------
    // Distribution
    // ---------------------------------------------------------------------

    /// Runs one distributor chunk.
    pub fn advance(&mut self, now: u64) -> Result<Effects> {
        self.distributor
            .advance(&mut self.gauges, &mut self.clock, now)
    }

    /// Calls [`advance`](Self::advance) until the cycle moves; returns every call's effects.
    pub fn close_cycle(&mut self, now: u64) -> Result<Vec<Effects>> {
        let mut calls = Vec::new();
        loop {
            let effects = self.advance(now)?;
            let done = effects.new_cycle.is_some();
            calls.push(effects);
            if done {
                return Ok(calls);
            }
        }
    }

    pub fn set_chunk_sizes(&mut self, caller: &Address, chunks: ChunkSizes) -> Result<()> {
        self.owner.ensure_owner(caller)?;
        self.distributor.set_chunks(chunks)?;
        info!(?chunks, "chunk sizes updated");
        Ok(())
    }

    pub fn set_inflation_ratio(&mut self, caller: &Address, ratio: Bps) -> Result<()> {
        self.owner.ensure_owner(caller)?;
        self.distributor.set_inflation_ratio(ratio);
        info!(ratio = ratio.get(), "inflation ratio updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WAD;
    use crate::CvgError;
    use std::collections::BTreeSet;

    fn dao() -> Address {
        Address::repeat_byte(0xda)
    }

    #[test]
    fn privileged_setters_require_owner() {
        let gauge = Address::repeat_byte(0x51);
        let mut e = CvgEngine::new(
            EngineConfig::default(),
            dao(),
            0,
            BTreeSet::from([gauge]),
        )
        .unwrap();
        let mallory = Address::repeat_byte(0x66);

        assert_eq!(e.add_type(&mallory, "staking", 1), Err(CvgError::NotOwner));
        let t = e.add_type(&dao(), "staking", 1).unwrap();
        assert_eq!(e.add_gauge(&mallory, gauge, t, 0), Err(CvgError::NotOwner));
        let g = e.add_gauge(&dao(), gauge, t, 0).unwrap();
        assert_eq!(e.kill_gauge(&mallory, g), Err(CvgError::NotOwner));
        assert_eq!(
            e.set_inflation_ratio(&mallory, Bps::ZERO),
            Err(CvgError::NotOwner)
        );
        assert!(e
            .set_chunk_sizes(
                &dao(),
                ChunkSizes {
                    checkpoint: 0,
                    total_weight: 1,
                    distribute: 1
                }
            )
            .is_err());

        e.transfer_ownership(&dao(), mallory).unwrap();
        e.accept_ownership(&mallory).unwrap();
        e.kill_gauge(&mallory, g).unwrap();
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.distribution.max_chunk_distribute = 0;
        assert!(CvgEngine::new(config, dao(), 0, BTreeSet::new()).is_err());
    }

    #[test]
    fn operations_use_the_current_cycle() {
        let mut e = CvgEngine::new(EngineConfig::default(), dao(), 0, BTreeSet::new()).unwrap();
        let token = e
            .mint_position(
                &dao(),
                MintPosition {
                    lock_duration: 11,
                    amount: 96 * WAD,
                    ys_percentage: 0,
                    receiver: dao(),
                    with_lock: false,
                },
                0,
            )
            .unwrap();
        let pos = e.locking().position(token).unwrap();
        assert_eq!((pos.start_cycle, pos.last_end_cycle), (1, 12));
        assert_eq!(e.locking().balance_of_mg_cvg_at(token, 1).unwrap(), 11 * WAD);
    }
}

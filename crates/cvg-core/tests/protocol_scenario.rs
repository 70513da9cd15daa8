//! End-to-end scenarios through the engine facade.
//!
//! Locks, votes and distribution passes driven the way a keeper and users would,
//! with the cycle moving only through `close_cycle`.

use std::collections::BTreeSet;

use cvg_core::config::{EngineConfig, WEEK_SECS};
use cvg_core::gauge::GaugeVote;
use cvg_core::locking::MintPosition;
use cvg_core::math::mul_div_floor;
use cvg_core::rewards::inflation::INITIAL_INFLATION;
use cvg_core::rewards::Phase;
use cvg_core::types::WAD;
use cvg_core::{Address, Amount, CvgEngine, CvgError, GaugeId, TokenId};

// =============================================================================
// Helpers
// =============================================================================

fn dao() -> Address {
    Address::repeat_byte(0xda)
}

fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

fn gauge_addr(i: u8) -> Address {
    Address::repeat_byte(0x40 + i)
}

struct Protocol {
    engine: CvgEngine,
    now: u64,
}

impl Protocol {
    fn new(config: EngineConfig, n_gauges: u8) -> Protocol {
        let directory: BTreeSet<Address> = (0..n_gauges).map(gauge_addr).collect();
        let engine = CvgEngine::new(config, dao(), 0, directory).unwrap();
        Protocol { engine, now: 0 }
    }

    fn close_cycle(&mut self) {
        self.now += WEEK_SECS;
        self.engine.close_cycle(self.now).unwrap();
    }

    fn close_until(&mut self, cycle: u64) {
        while self.engine.current_cycle() < cycle {
            self.close_cycle();
        }
    }

    fn mint(&mut self, owner: Address, amount: Amount, duration: u64, ys: u8) -> TokenId {
        self.engine
            .mint_position(
                &owner,
                MintPosition {
                    lock_duration: duration,
                    amount,
                    ys_percentage: ys,
                    receiver: owner,
                    with_lock: false,
                },
                self.now,
            )
            .unwrap()
    }
}

// =============================================================================
// Lock lifecycle
// =============================================================================

#[test]
fn lock_increase_scenario_matches_reference_figures() {
    let mut p = Protocol::new(EngineConfig::default(), 0);
    p.close_until(2);
    let t = p.mint(alice(), 10_000 * WAD, 10, 40);
    assert_eq!(p.engine.locking().balance_of_mg_cvg_at(t, 2).unwrap(), 625 * WAD);

    p.close_until(8);
    p.engine
        .increase_lock_amount(&alice(), t, 10_000 * WAD)
        .unwrap();
    assert_eq!(p.engine.locking().balance_of_mg_cvg_at(t, 8).unwrap(), 875 * WAD);

    p.close_until(11);
    p.engine
        .increase_lock_time_and_amount(&alice(), t, 48, 10_000 * WAD)
        .unwrap();
    let locking = p.engine.locking();
    assert_eq!(
        locking.balance_of_mg_cvg_at(t, 11).unwrap(),
        3_937 * WAD + WAD / 2
    );
    assert_eq!(locking.position(t).unwrap().last_end_cycle, 60);
    assert_eq!(locking.total_supply_of_mg_cvg_at(11).unwrap(), 3_937 * WAD + WAD / 2);
    assert!(locking.balance_of_ys_cvg_at(t, 13).unwrap() > locking.balance_of_ys_cvg_at(t, 12).unwrap());
}

#[test]
fn expired_position_can_be_burned_once() {
    let mut p = Protocol::new(EngineConfig::default(), 0);
    let t = p.mint(alice(), 5 * WAD, 11, 0);
    assert_eq!(
        p.engine.burn_position(&alice(), t, p.now),
        Err(CvgError::StillLocked { last_end_cycle: 12 })
    );
    p.close_until(13);
    assert_eq!(p.engine.burn_position(&alice(), t, p.now).unwrap(), 5 * WAD);
    assert_eq!(
        p.engine.burn_position(&alice(), t, p.now),
        Err(CvgError::PositionNotFound(t))
    );
}

// =============================================================================
// Votes to rewards
// =============================================================================

#[test]
fn votes_drive_next_cycle_rewards() {
    let mut p = Protocol::new(EngineConfig::default(), 3);
    let staking = p.engine.add_type(&dao(), "staking", 1).unwrap();
    let boosted = p.engine.add_type(&dao(), "boosted", 2).unwrap();
    let g0 = p.engine.add_gauge(&dao(), gauge_addr(0), staking, 0).unwrap();
    let g1 = p.engine.add_gauge(&dao(), gauge_addr(1), staking, 0).unwrap();
    let g2 = p.engine.add_gauge(&dao(), gauge_addr(2), boosted, 0).unwrap();

    let a = p.mint(alice(), 960 * WAD, 23, 0);
    let b = p.mint(bob(), 480 * WAD, 23, 0);
    p.engine
        .multi_vote(
            &alice(),
            &[
                GaugeVote { token: a, gauge: g0, weight: 7_500 },
                GaugeVote { token: a, gauge: g1, weight: 2_500 },
            ],
            p.now,
        )
        .unwrap();
    p.engine.simple_vote(&bob(), b, g2, 10_000, p.now).unwrap();

    // Cycle 1 mints nothing; cycle 2 pays out the votes cast during cycle 1.
    p.close_cycle();
    let rewards = p.engine.distributor().rewards();
    assert_eq!(rewards.total_for_cycle(1).unwrap(), 0);

    p.close_cycle();
    let rewards = p.engine.distributor().rewards();
    let paid = |g: GaugeId| rewards.reward_of(g, 2).cvg_rewards_amount;
    assert_eq!(paid(g0), mul_div_floor(INITIAL_INFLATION, 3, 8).unwrap());
    assert_eq!(paid(g1), mul_div_floor(INITIAL_INFLATION, 1, 8).unwrap());
    assert_eq!(paid(g2), mul_div_floor(INITIAL_INFLATION, 1, 2).unwrap());
    assert!(rewards.total_for_cycle(2).unwrap() <= INITIAL_INFLATION);
    assert_eq!(
        p.engine.gauge_relative_weight_write(g2, 2).unwrap(),
        WAD / 2
    );
}

#[test]
fn admin_bias_counts_in_voting_power_units() {
    let mut p = Protocol::new(EngineConfig::default(), 2);
    let staking = p.engine.add_type(&dao(), "staking", 1).unwrap();
    let seeded = p
        .engine
        .add_gauge(&dao(), gauge_addr(0), staking, 220 * WAD)
        .unwrap();
    let voted = p.engine.add_gauge(&dao(), gauge_addr(1), staking, 0).unwrap();
    let a = p.mint(alice(), 960 * WAD, 23, 0);
    p.engine.simple_vote(&alice(), a, voted, 10_000, p.now).unwrap();

    let gauges = p.engine.gauges();
    assert_eq!(
        gauges.gauge_weight_at(voted, 2).unwrap(),
        p.engine.locking().voting_power_at(a, 2).unwrap()
    );
    assert_eq!(gauges.gauge_weight_at(voted, 2).unwrap(), 220 * WAD);

    p.close_until(3);
    let rewards = p.engine.distributor().rewards();
    let half = mul_div_floor(INITIAL_INFLATION, 1, 2).unwrap();
    assert_eq!(rewards.reward_of(seeded, 2).cvg_rewards_amount, half);
    assert_eq!(rewards.reward_of(voted, 2).cvg_rewards_amount, half);
}

#[test]
fn vote_ledger_rejects_votes_mid_pass() {
    let mut config = EngineConfig::default();
    config.distribution.max_chunk_checkpoint = 1;
    let mut p = Protocol::new(config, 2);
    let t0 = p.engine.add_type(&dao(), "staking", 1).unwrap();
    let g0 = p.engine.add_gauge(&dao(), gauge_addr(0), t0, 1).unwrap();
    p.engine.add_gauge(&dao(), gauge_addr(1), t0, 1).unwrap();
    let a = p.mint(alice(), 960 * WAD, 23, 0);

    p.now += WEEK_SECS;
    let effects = p.engine.advance(p.now).unwrap();
    assert_eq!(effects.phase_after, Phase::Checkpoint);
    assert_eq!(
        p.engine.simple_vote(&alice(), a, g0, 10_000, p.now),
        Err(CvgError::VoteLedgerLocked)
    );
    p.engine.close_cycle(p.now).unwrap();
    p.engine.simple_vote(&alice(), a, g0, 10_000, p.now).unwrap();
}

// =============================================================================
// Chunking
// =============================================================================

fn run_protocol(chunk: usize) -> Vec<Vec<(u64, Amount)>> {
    let mut config = EngineConfig::default();
    config.distribution.max_chunk_checkpoint = chunk;
    config.distribution.max_loop_set_total_weight = chunk;
    config.distribution.max_chunk_distribute = chunk;
    let mut p = Protocol::new(config, 7);
    let staking = p.engine.add_type(&dao(), "staking", 1).unwrap();
    let boosted = p.engine.add_type(&dao(), "boosted", 3).unwrap();
    let gauges: Vec<GaugeId> = (0..7u8)
        .map(|i| {
            let ty = if i % 2 == 0 { staking } else { boosted };
            p.engine
                .add_gauge(&dao(), gauge_addr(i), ty, i as u128 * WAD)
                .unwrap()
        })
        .collect();

    let a = p.mint(alice(), 1_000 * WAD, 35, 20);
    let b = p.mint(bob(), 3_333 * WAD, 11, 50);
    for (i, g) in gauges.iter().enumerate() {
        p.engine
            .simple_vote(&alice(), a, *g, 1_000 + i as u16 * 100, p.now)
            .unwrap();
    }
    p.engine.simple_vote(&bob(), b, gauges[6], 9_000, p.now).unwrap();

    for cycle in 1..=6u64 {
        if cycle == 3 {
            p.engine.kill_gauge(&dao(), gauges[2]).unwrap();
        }
        p.close_cycle();
    }
    gauges
        .iter()
        .map(|g| p.engine.distributor().rewards().rewards_of_gauge(*g).collect())
        .collect()
}

#[test]
fn rewards_do_not_depend_on_chunk_size() {
    let reference = run_protocol(1_000);
    assert_eq!(run_protocol(3), reference);
    assert_eq!(run_protocol(1), reference);
    // The killed gauge stops receiving rewards from the cycle it was killed in.
    assert_eq!(reference[2].iter().map(|(c, _)| *c).max(), Some(2));
}

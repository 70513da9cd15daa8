//! `cvg simulate` command implementation
//!
//! A scenario is a JSON document naming the owner, the certified staking contracts
//! and an ordered list of tagged actions. The simulated wall clock only moves
//! through `wait` and the cycle-closing actions.

use anyhow::{Context, Result};
use cvg_core::gauge::GaugeVote;
use cvg_core::locking::MintPosition;
use cvg_core::{Address, Bps, CvgEngine, EngineConfig, GaugeId, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

use super::{format_tokens, parse_tokens};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Scenario {
    owner: Address,
    #[serde(default)]
    genesis_ts: u64,
    #[serde(default)]
    staking_contracts: BTreeSet<Address>,
    /// Replaces the configuration loaded from `--config`.
    #[serde(default)]
    config: Option<EngineConfig>,
    actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
enum Action {
    AddType {
        name: String,
        weight: u128,
    },
    ChangeTypeWeight {
        gauge_type: usize,
        weight: u128,
    },
    AddGauge {
        address: Address,
        gauge_type: usize,
        #[serde(default)]
        initial_weight: u128,
    },
    KillGauge {
        gauge: u32,
    },
    ToggleVotePause {
        gauge: u32,
    },
    Mint {
        caller: Address,
        receiver: Option<Address>,
        lock_duration: u64,
        amount: String,
        #[serde(default)]
        ys_percentage: u8,
        #[serde(default)]
        with_lock: bool,
    },
    IncreaseLockAmount {
        caller: Address,
        token: u64,
        amount: String,
    },
    IncreaseLockTime {
        caller: Address,
        token: u64,
        added: u64,
    },
    IncreaseLockTimeAndAmount {
        caller: Address,
        token: u64,
        added: u64,
        amount: String,
    },
    Vote {
        caller: Address,
        token: u64,
        gauge: u32,
        weight: u16,
    },
    MultiVote {
        caller: Address,
        votes: Vec<GaugeVote>,
    },
    Delegate {
        caller: Address,
        token: u64,
        delegate: Option<Address>,
    },
    Burn {
        caller: Address,
        token: u64,
    },
    SetInflationRatio {
        bps: u16,
    },
    Wait {
        secs: u64,
    },
    /// One distributor chunk at the current time.
    Advance,
    /// Waits for the distribution window if needed, then runs a full pass.
    CloseCycle,
    CloseCycles {
        count: u64,
    },
}

#[derive(Serialize)]
struct Report {
    final_cycle: u64,
    now: u64,
    minted: String,
    inflation_ratio_bps: u16,
    gauges: Vec<GaugeReport>,
    positions: Vec<PositionReport>,
}

#[derive(Serialize)]
struct GaugeReport {
    id: u32,
    address: Address,
    killed: bool,
    paused: bool,
    weight: String,
    rewards: Vec<RewardRow>,
}

#[derive(Serialize)]
struct RewardRow {
    cycle: u64,
    amount: String,
}

#[derive(Serialize)]
struct PositionReport {
    token: u64,
    owner: Address,
    start_cycle: u64,
    last_end_cycle: u64,
    locked: String,
    mg_cvg: String,
    ys_cvg: String,
    voting_power: String,
    used_power_bps: u16,
}

struct Simulation {
    engine: CvgEngine,
    owner: Address,
    now: u64,
}

impl Simulation {
    fn apply(&mut self, action: &Action) -> Result<()> {
        let owner = self.owner;
        let now = self.now;
        let e = &mut self.engine;
        match action {
            Action::AddType { name, weight } => {
                e.add_type(&owner, name, *weight)?;
            }
            Action::ChangeTypeWeight { gauge_type, weight } => {
                e.change_type_weight(&owner, *gauge_type, *weight)?;
            }
            Action::AddGauge {
                address,
                gauge_type,
                initial_weight,
            } => {
                e.add_gauge(&owner, *address, *gauge_type, *initial_weight)?;
            }
            Action::KillGauge { gauge } => e.kill_gauge(&owner, GaugeId(*gauge))?,
            Action::ToggleVotePause { gauge } => {
                e.toggle_vote_pause(&owner, GaugeId(*gauge))?;
            }
            Action::Mint {
                caller,
                receiver,
                lock_duration,
                amount,
                ys_percentage,
                with_lock,
            } => {
                let params = MintPosition {
                    lock_duration: *lock_duration,
                    amount: parse_tokens(amount)?,
                    ys_percentage: *ys_percentage,
                    receiver: receiver.unwrap_or(*caller),
                    with_lock: *with_lock,
                };
                e.mint_position(caller, params, now)?;
            }
            Action::IncreaseLockAmount {
                caller,
                token,
                amount,
            } => {
                e.increase_lock_amount(caller, TokenId(*token), parse_tokens(amount)?)?;
            }
            Action::IncreaseLockTime {
                caller,
                token,
                added,
            } => e.increase_lock_time(caller, TokenId(*token), *added)?,
            Action::IncreaseLockTimeAndAmount {
                caller,
                token,
                added,
                amount,
            } => {
                e.increase_lock_time_and_amount(
                    caller,
                    TokenId(*token),
                    *added,
                    parse_tokens(amount)?,
                )?;
            }
            Action::Vote {
                caller,
                token,
                gauge,
                weight,
            } => e.simple_vote(caller, TokenId(*token), GaugeId(*gauge), *weight, now)?,
            Action::MultiVote { caller, votes } => e.multi_vote(caller, votes, now)?,
            Action::Delegate {
                caller,
                token,
                delegate,
            } => e.delegate_votes(caller, TokenId(*token), *delegate)?,
            Action::Burn { caller, token } => {
                let principal = e.burn_position(caller, TokenId(*token), now)?;
                info!(token, principal = %format_tokens(principal), "position burned");
            }
            Action::SetInflationRatio { bps } => {
                e.set_inflation_ratio(&owner, Bps::new(*bps)?)?;
            }
            Action::Wait { secs } => {
                self.now = now.saturating_add(*secs);
            }
            Action::Advance => {
                let effects = e.advance(now)?;
                debug!(?effects, "advance");
            }
            Action::CloseCycle => self.close_cycle()?,
            Action::CloseCycles { count } => {
                for _ in 0..*count {
                    self.close_cycle()?;
                }
            }
        }
        Ok(())
    }

    fn close_cycle(&mut self) -> Result<()> {
        let distributor = self.engine.distributor();
        if !distributor.state().in_flight() {
            self.now = self.now.max(distributor.next_distribution_time());
        }
        let calls = self.engine.close_cycle(self.now)?;
        info!(
            cycle = self.engine.current_cycle(),
            calls = calls.len(),
            "cycle closed"
        );
        Ok(())
    }

    fn report(&self) -> Result<Report> {
        let e = &self.engine;
        let cycle = e.current_cycle();
        let gc = e.gauges();
        let rewards = e.distributor().rewards();

        let gauges = (0..gc.n_gauges())
            .map(|i| -> Result<GaugeReport> {
                let id = GaugeId(u32::try_from(i)?);
                let gauge = gc.gauge(id)?;
                Ok(GaugeReport {
                    id: id.0,
                    address: gauge.address,
                    killed: gauge.killed,
                    paused: gauge.paused,
                    weight: gc.gauge_weight_at(id, cycle)?.to_string(),
                    rewards: rewards
                        .rewards_of_gauge(id)
                        .map(|(cycle, amount)| RewardRow {
                            cycle,
                            amount: format_tokens(amount),
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let locking = e.locking();
        let positions = locking
            .positions()
            .map(|(token, p)| -> Result<PositionReport> {
                Ok(PositionReport {
                    token: token.0,
                    owner: p.owner,
                    start_cycle: p.start_cycle,
                    last_end_cycle: p.last_end_cycle,
                    locked: format_tokens(p.total_cvg_locked),
                    mg_cvg: format_tokens(locking.balance_of_mg_cvg_at(token, cycle)?),
                    ys_cvg: format_tokens(locking.balance_of_ys_cvg_at(token, cycle)?),
                    voting_power: format_tokens(locking.voting_power_at(token, cycle)?),
                    used_power_bps: gc.used_power(token),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Report {
            final_cycle: cycle,
            now: self.now,
            minted: format_tokens(e.distributor().minted()),
            inflation_ratio_bps: e.distributor().inflation_ratio().get(),
            gauges,
            positions,
        })
    }
}

fn simulate(scenario: Scenario, config: EngineConfig) -> Result<Report> {
    let config = scenario.config.unwrap_or(config);
    let engine = CvgEngine::new(
        config,
        scenario.owner,
        scenario.genesis_ts,
        scenario.staking_contracts,
    )
    .context("Failed to initialize engine")?;
    let mut sim = Simulation {
        engine,
        owner: scenario.owner,
        now: scenario.genesis_ts,
    };

    for (i, action) in scenario.actions.iter().enumerate() {
        debug!(index = i, ?action, "applying action");
        sim.apply(action)
            .with_context(|| format!("Action #{i} failed: {action:?}"))?;
    }
    sim.report()
}

pub fn run(path: &Path, format: &str, config: EngineConfig) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid scenario file: {}", path.display()))?;
    let report = simulate(scenario, config)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📊 Simulation report");
    println!();
    println!("   Cycle: {}", report.final_cycle);
    println!("   Time: {}", report.now);
    println!("   Minted for staking: {}", report.minted);
    println!("   Inflation ratio: {} bps", report.inflation_ratio_bps);
    println!();
    println!("⚖️  Gauges");
    for g in &report.gauges {
        let status = match (g.killed, g.paused) {
            (true, _) => " (killed)",
            (false, true) => " (paused)",
            _ => "",
        };
        println!("   #{} {}{} weight={}", g.id, g.address, status, g.weight);
        for r in g.rewards.iter().filter(|r| r.amount != "0") {
            println!("      cycle {:>5}: {}", r.cycle, r.amount);
        }
    }
    println!();
    println!("🔒 Positions");
    for p in &report.positions {
        println!(
            "   #{} owner={} locked={} cycles {}..{}",
            p.token, p.owner, p.locked, p.start_cycle, p.last_end_cycle
        );
        println!(
            "      mgCvg={} ysCvg={} voting power={} used={} bps",
            p.mg_cvg, p.ys_cvg, p.voting_power, p.used_power_bps
        );
    }
    Ok(())
}

//! Engine configuration.
//!
//! Provides structured configuration with validation for all engine components.
//!
//! # Configuration Sources
//!
//! - Programmatic defaults (`EngineConfig::default()`)
//! - JSON documents (`EngineConfig::from_json`)
//! - Environment variable overrides prefixed with `CVG_` (`EngineConfig::apply_env`)
//!
//! Every source ends in `validate()`; an invalid configuration never reaches the engine.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, Bps, WAD};
use crate::{CvgError, Result};

pub const DAY_SECS: u64 = 86_400;
pub const WEEK_SECS: u64 = 7 * DAY_SECS;

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub locking: LockingConfig,
    pub voting: VotingConfig,
    pub distribution: DistributionConfig,
    pub bounds: BoundsConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| CvgError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `CVG_*` environment overrides on top of `self`, then validate.
    ///
    /// - `CVG_MAX_CHUNK_CHECKPOINT`
    /// - `CVG_MAX_LOOP_SET_TOTAL_WEIGHT`
    /// - `CVG_MAX_CHUNK_DISTRIBUTE`
    /// - `CVG_INFLATION_RATIO_BPS`
    /// - `CVG_VOTE_COOLDOWN_SECS`
    /// - `CVG_LOG_LEVEL`
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse::<usize>("CVG_MAX_CHUNK_CHECKPOINT")? {
            self.distribution.max_chunk_checkpoint = v;
        }
        if let Some(v) = env_parse::<usize>("CVG_MAX_LOOP_SET_TOTAL_WEIGHT")? {
            self.distribution.max_loop_set_total_weight = v;
        }
        if let Some(v) = env_parse::<usize>("CVG_MAX_CHUNK_DISTRIBUTE")? {
            self.distribution.max_chunk_distribute = v;
        }
        if let Some(v) = env_parse::<u16>("CVG_INFLATION_RATIO_BPS")? {
            self.distribution.inflation_ratio = Bps::new(v)
                .map_err(|e| CvgError::ConfigError(format!("Invalid CVG_INFLATION_RATIO_BPS: {e}")))?;
        }
        if let Some(v) = env_parse::<u64>("CVG_VOTE_COOLDOWN_SECS")? {
            self.voting.vote_cooldown_secs = v;
        }
        if let Ok(level) = std::env::var("CVG_LOG_LEVEL") {
            self.logging.level = level;
        }
        self.validate()
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let d = &self.distribution;
        for (name, v) in [
            ("max_chunk_checkpoint", d.max_chunk_checkpoint),
            ("max_loop_set_total_weight", d.max_loop_set_total_weight),
            ("max_chunk_distribute", d.max_chunk_distribute),
        ] {
            if v == 0 || v > self.bounds.max_gauges {
                return Err(CvgError::ConfigError(format!(
                    "{name} must be between 1 and max_gauges ({})",
                    self.bounds.max_gauges
                )));
            }
        }
        if d.distribution_interval_secs == 0 {
            return Err(CvgError::ConfigError(
                "distribution_interval_secs must be greater than 0".into(),
            ));
        }
        if d.max_staking_mint == 0 {
            return Err(CvgError::ConfigError(
                "max_staking_mint must be greater than 0".into(),
            ));
        }
        if self.locking.mint_timelock_secs > self.locking.max_timelock_secs {
            return Err(CvgError::ConfigError(
                "mint_timelock_secs must not exceed max_timelock_secs".into(),
            ));
        }
        let b = &self.bounds;
        if b.max_gauges == 0 || b.max_positions == 0 || b.max_extensions_per_position == 0 {
            return Err(CvgError::ConfigError("bounds must be greater than 0".into()));
        }
        if b.max_gauges > BoundsConfig::HARD_MAX_GAUGES {
            return Err(CvgError::ConfigError(format!(
                "max_gauges must be at most {}",
                BoundsConfig::HARD_MAX_GAUGES
            )));
        }
        // A time+amount increase appends two records at once.
        if b.max_extensions_per_position < 2 {
            return Err(CvgError::ConfigError(
                "max_extensions_per_position must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| CvgError::ConfigError(format!("Invalid {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Lock ledger configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingConfig {
    /// Transfer timelock applied to positions minted `with_lock`.
    pub mint_timelock_secs: u64,

    /// Furthest a position timelock may be set into the future.
    pub max_timelock_secs: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            mint_timelock_secs: DAY_SECS,
            max_timelock_secs: 10 * DAY_SECS,
        }
    }
}

/// Vote ledger configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Minimum delay between two votes of a position on the same gauge.
    pub vote_cooldown_secs: u64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            vote_cooldown_secs: 10 * DAY_SECS,
        }
    }
}

/// Reward distributor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Gauges checkpointed per `advance` call in CHECKPOINT.
    pub max_chunk_checkpoint: usize,

    /// Gauges summed per `advance` call in TOTAL_WEIGHT.
    pub max_loop_set_total_weight: usize,

    /// Gauges paid per `advance` call in DISTRIBUTE.
    pub max_chunk_distribute: usize,

    /// Minimum time between two distribution passes.
    pub distribution_interval_secs: u64,

    /// Scales the inflation schedule (governance-tunable).
    pub inflation_ratio: Bps,

    /// Lifetime cap on tokens minted for staking rewards.
    pub max_staking_mint: Amount,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            max_chunk_checkpoint: 50,
            max_loop_set_total_weight: 50,
            max_chunk_distribute: 50,
            distribution_interval_secs: WEEK_SECS,
            inflation_ratio: Bps::MAX,
            max_staking_mint: 60_000_000 * WAD,
        }
    }
}

/// Runtime bounds: safety limits on state size, not economic parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    pub max_gauges: usize,
    pub max_positions: usize,
    pub max_extensions_per_position: usize,
}

impl BoundsConfig {
    pub const HARD_MAX_GAUGES: usize = 10_000;
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            max_gauges: 1024,
            max_positions: 1_000_000,
            max_extensions_per_position: 256,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

//! CLI Command Implementations

pub mod config;
pub mod inflation;
pub mod simulate;

use anyhow::{bail, Context, Result};
use cvg_core::types::WAD;
use cvg_core::{Amount, EngineConfig};
use std::path::Path;

/// Load the engine configuration: JSON file if given, defaults otherwise,
/// `CVG_*` environment overrides on top.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            EngineConfig::from_json(&raw)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid CVG_* environment override")?;
    Ok(config)
}

/// Parse a token amount written in whole tokens, e.g. `"1250.5"`.
pub fn parse_tokens(raw: &str) -> Result<Amount> {
    let raw = raw.trim();
    let (int, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if int.is_empty() && frac.is_empty() {
        bail!("empty token amount");
    }
    if frac.len() > 18 {
        bail!("token amount {raw} has more than 18 decimals");
    }
    let int: u128 = if int.is_empty() {
        0
    } else {
        int.parse()
            .with_context(|| format!("invalid token amount: {raw}"))?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<18}")
            .parse()
            .with_context(|| format!("invalid token amount: {raw}"))?
    };
    int.checked_mul(WAD)
        .and_then(|v| v.checked_add(frac))
        .with_context(|| format!("token amount {raw} overflows"))
}

/// Render a fixed-point amount as whole tokens, trailing zeros trimmed.
pub fn format_tokens(amount: Amount) -> String {
    let int = amount / WAD;
    let frac = amount % WAD;
    if frac == 0 {
        return int.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}

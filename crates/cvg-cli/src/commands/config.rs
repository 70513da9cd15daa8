//! `cvg config` command implementation

use anyhow::Result;
use cvg_core::EngineConfig;

pub fn run(config: &EngineConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

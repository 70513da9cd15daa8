//! `cvg inflation` command implementation

use anyhow::{bail, Context, Result};
use cvg_core::rewards::staking_inflation_at;
use cvg_core::{Bps, EngineConfig};
use serde::Serialize;

use super::format_tokens;

#[derive(Serialize)]
struct Row {
    cycle: u64,
    /// Fixed-point amount, 18 decimals.
    amount: String,
    tokens: String,
}

pub fn run(
    from: u64,
    to: u64,
    step: u64,
    ratio: Option<u16>,
    format: &str,
    config: &EngineConfig,
) -> Result<()> {
    let ratio = match ratio {
        Some(bps) => Bps::new(bps).context("Invalid --ratio")?,
        None => config.distribution.inflation_ratio,
    };
    let rows = table(from, to, step, ratio)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Staking inflation (ratio {} bps)", ratio.get());
    println!();
    println!("{:>8}  {:>32}", "cycle", "tokens");
    for row in &rows {
        println!("{:>8}  {:>32}", row.cycle, row.tokens);
    }
    Ok(())
}

fn table(from: u64, to: u64, step: u64, ratio: Bps) -> Result<Vec<Row>> {
    if step == 0 {
        bail!("--step must be greater than 0");
    }
    if from > to {
        bail!("--from must not exceed --to");
    }
    (from..=to)
        .step_by(usize::try_from(step).context("--step too large")?)
        .map(|cycle| -> Result<Row> {
            let amount = staking_inflation_at(cycle, ratio)?;
            Ok(Row {
                cycle,
                amount: amount.to_string(),
                tokens: format_tokens(amount),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rows_follow_the_schedule() {
        let rows = table(1, 157, 52, Bps::new(5_000).unwrap()).unwrap();
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "cycle": 1, "amount": "0", "tokens": "0" },
                {
                    "cycle": 53,
                    "amount": "30288461538461538461538",
                    "tokens": "30288.461538461538461538"
                },
                {
                    "cycle": 105,
                    "amount": "21417176545554083683896",
                    "tokens": "21417.176545554083683896"
                },
                {
                    "cycle": 157,
                    "amount": "21417176545554083683896",
                    "tokens": "21417.176545554083683896"
                }
            ])
        );
    }

    #[test]
    fn bad_ranges_are_rejected() {
        assert!(table(1, 10, 0, Bps::MAX).is_err());
        assert!(table(11, 10, 1, Bps::MAX).is_err());
        assert_eq!(table(7, 7, 3, Bps::MAX).unwrap().len(), 1);
    }
}

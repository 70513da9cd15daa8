//! Staking inflation schedule.
//!
//! Flat per cycle within each 105-cycle period, divided by sqrt(2) at every period
//! boundary, frozen after ten divisions.

use crate::math::{floor_bps, mul_div_floor};
use crate::types::{Amount, Bps, Cycle, WAD};
use crate::Result;

/// sqrt(2) with 18 decimals.
pub const SQRT_2: u128 = 1_414_213_562_373_095_048;
/// 3_150_000 tokens spread over the 52 cycles of the first year.
pub const INITIAL_INFLATION: Amount = 60_576_923_076_923_076_923_076;
pub const INFLATION_CHANGE_INTERVAL: Cycle = 105;
pub const END_INFLATION_CYCLE: Cycle = 1041;
/// `INITIAL_INFLATION` after ten fixed-point divisions by `SQRT_2`.
pub const END_INFLATION_AMOUNT: Amount = 1_893_028_846_153_846_164_575;

/// Tokens minted for gauges at the end of `cycle`, before the ratio is applied.
pub fn base_inflation_at(cycle: Cycle) -> Result<Amount> {
    if cycle <= 1 {
        return Ok(0);
    }
    if cycle >= END_INFLATION_CYCLE {
        return Ok(END_INFLATION_AMOUNT);
    }
    (0..cycle / INFLATION_CHANGE_INTERVAL)
        .try_fold(INITIAL_INFLATION, |x, _| mul_div_floor(x, WAD, SQRT_2))
}

/// Inflation of `cycle` scaled by `ratio`.
pub fn staking_inflation_at(cycle: Cycle, ratio: Bps) -> Result<Amount> {
    floor_bps(base_inflation_at(cycle)?, ratio)
}

use primitive_types::U256;

use crate::types::{Bps, BPS_U128};
use crate::{CvgError, Result};

fn to_u128(v: U256, what: &str) -> Result<u128> {
    if v > U256::from(u128::MAX) {
        return Err(CvgError::BoundedValueExceeded(format!(
            "u128 overflow in {what}"
        )));
    }
    Ok(v.low_u128())
}

/// `floor(a * b / denom)` with a 256-bit intermediate.
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> Result<u128> {
    if denom == 0 {
        return Err(CvgError::InvalidInput("division by zero".into()));
    }
    // u128 * u128 always fits in 256 bits.
    let num = U256::from(a) * U256::from(b);
    to_u128(num / U256::from(denom), "mul_div")
}

/// `floor(a * b * c / denom)` with a 256-bit intermediate.
pub fn mul3_div_floor(a: u128, b: u128, c: u128, denom: u128) -> Result<u128> {
    if denom == 0 {
        return Err(CvgError::InvalidInput("division by zero".into()));
    }
    let ab = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or_else(|| CvgError::BoundedValueExceeded("u256 overflow in mul".into()))?;
    let abc = ab
        .checked_mul(U256::from(c))
        .ok_or_else(|| CvgError::BoundedValueExceeded("u256 overflow in mul".into()))?;
    to_u128(abc / U256::from(denom), "mul3_div")
}

pub fn add_u128(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b)
        .ok_or_else(|| CvgError::BoundedValueExceeded("u128 overflow in add".into()))
}

pub fn mul_u128(a: u128, b: u128) -> Result<u128> {
    a.checked_mul(b)
        .ok_or_else(|| CvgError::BoundedValueExceeded("u128 overflow in mul".into()))
}

pub fn floor_bps(amount: u128, bps: Bps) -> Result<u128> {
    mul_div_floor(amount, bps.as_u128(), BPS_U128)
}

//! Shared split math for GameRoom contracts.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{Env, Vec};

/// Error codes for share calculations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Error {
    InvalidAmount = 1,
    InvalidWeights = 2,
    Overflow = 3,
}

/// Constant for basis points divisor.
pub const BASIS_POINTS_DIVISOR: u32 = 10_000;

/// Floor of `amount * bps / 10_000`.
pub fn calculate_share(amount: i128, bps: u32) -> Result<i128, Error> {
    if amount < 0 {
        return Err(Error::InvalidAmount);
    }
    if bps > BASIS_POINTS_DIVISOR {
        return Err(Error::InvalidWeights);
    }
    amount
        .checked_mul(bps as i128)
        .and_then(|v| v.checked_div(BASIS_POINTS_DIVISOR as i128))
        .ok_or(Error::Overflow)
}

/// Splits `total` across `weights_bps` in order.
///
/// Every slot but the last receives its floored basis-point share; the last
/// slot receives whatever is left, so the returned amounts always sum to
/// `total` exactly. The weight given for the last slot is only used for
/// validation.
pub fn split_with_remainder(
    env: &Env,
    total: i128,
    weights_bps: &[u32],
) -> Result<Vec<i128>, Error> {
    if total < 0 {
        return Err(Error::InvalidAmount);
    }
    if weights_bps.is_empty() {
        return Err(Error::InvalidWeights);
    }

    let mut weight_sum: u32 = 0;
    for w in weights_bps {
        weight_sum = weight_sum.checked_add(*w).ok_or(Error::Overflow)?;
    }
    if weight_sum > BASIS_POINTS_DIVISOR {
        return Err(Error::InvalidWeights);
    }

    let last = weights_bps.len() - 1;
    let mut shares = Vec::new(env);
    let mut assigned: i128 = 0;
    for bps in &weights_bps[..last] {
        let share = calculate_share(total, *bps)?;
        assigned = assigned.checked_add(share).ok_or(Error::Overflow)?;
        shares.push_back(share);
    }
    shares.push_back(total.checked_sub(assigned).ok_or(Error::Overflow)?);

    Ok(shares)
}

use soroban_sdk::{Env, I256};

use crate::constants::PERCENTAGE_100;
use crate::errors::Error;

/// `a * b / denominator`, rounded down
///
/// The product is widened to 256 bits when it leaves the `i128` range, so
/// only a quotient that does not fit fails.
pub fn mul_div(env: &Env, a: i128, b: i128, denominator: i128) -> Result<i128, Error> {
    if denominator == 0 {
        return Err(Error::ZeroValue);
    }
    if let Some(product) = a.checked_mul(b) {
        return product.checked_div(denominator).ok_or(Error::Overflow);
    }

    I256::from_i128(env, a)
        .mul(&I256::from_i128(env, b))
        .div(&I256::from_i128(env, denominator))
        .to_i128()
        .ok_or(Error::Overflow)
}

/// Applies a `PERCENTAGE_100`-based fraction to `amount`
pub fn percentage(env: &Env, amount: i128, fraction: i128) -> Result<i128, Error> {
    mul_div(env, amount, fraction, PERCENTAGE_100)
}

pub fn add(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_add(b).ok_or(Error::Overflow)
}

pub fn sub(a: i128, b: i128) -> Result<i128, Error> {
    a.checked_sub(b).ok_or(Error::Overflow)
}

/// Maximum aggregate open-position value allowed for a stake of `value`.
///
/// With `k = floor(value / threshold)`:
/// `((k + 1)(2v - t) + t - k²t) / slope + 2v`
///
/// Writing `v = kt + r`, the numerator reduces to `k(v + r + t) + 2r`, and
/// splitting `k` by `slope` keeps every intermediate below the result.
pub fn max_leverage(value: i128, threshold: i128, slope: i128) -> Result<i128, Error> {
    if threshold <= 0 || slope <= 0 || value < 0 {
        return Err(Error::InvParams);
    }

    let k = value / threshold;
    let rest = value % threshold;
    let span = add(add(value, rest)?, threshold)?;
    let double_value = value.checked_mul(2).ok_or(Error::Overflow)?;

    let whole = (k / slope).checked_mul(span).ok_or(Error::Overflow)?;
    let partial = (k % slope)
        .checked_mul(span)
        .and_then(|p| p.checked_add(2 * rest))
        .ok_or(Error::Overflow)?;

    add(add(whole, partial / slope)?, double_value)
}

/// Fee fraction applied to a positive gain.
///
/// The pool's nominal percentage is capped by the period cap, then raised to
/// the configured floor; the floor wins when it exceeds the cap.
pub fn commission_fraction(pool_percentage: i128, period_cap: i128, floor: i128) -> i128 {
    pool_percentage.min(period_cap).max(floor)
}

/// Shares to mint so that, after minting, they are worth exactly `fee` of a
/// pool valued `value` with `supply` shares outstanding.
pub fn dilution_shares(env: &Env, fee: i128, supply: i128, value: i128) -> Result<i128, Error> {
    if fee <= 0 || supply <= 0 {
        return Ok(0);
    }
    let remaining = sub(value, fee)?;
    if remaining <= 0 {
        return Err(Error::ZeroValue);
    }
    mul_div(env, fee, supply, remaining)
}

/// Splits minted commission shares into `(trader, treasury, dividends, insurance)`.
///
/// Rounding dust of the protocol part goes to the treasury.
pub fn split_commission(
    env: &Env,
    total: i128,
    protocol_percentage: i128,
    dividends_percentage: i128,
    insurance_percentage: i128,
) -> Result<(i128, i128, i128, i128), Error> {
    let protocol = percentage(env, total, protocol_percentage)?;
    let dividends = percentage(env, protocol, dividends_percentage)?;
    let insurance = percentage(env, protocol, insurance_percentage)?;
    let treasury = sub(sub(protocol, dividends)?, insurance)?;
    if treasury < 0 {
        return Err(Error::InvParams);
    }

    Ok((sub(total, protocol)?, treasury, dividends, insurance))
}

pub fn epoch_of(timestamp: u64, duration: u64) -> u64 {
    if duration == 0 {
        return 0;
    }
    timestamp / duration
}

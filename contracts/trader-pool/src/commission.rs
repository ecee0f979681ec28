//! Trader performance commission.
//!
//! A holder's gain above `max(invested_base, high_water_mark)` is charged once
//! per elapsed epoch. The fee is paid by minting new shares worth exactly the
//! fee after the mint, split between the trader and the protocol recipients.

use shared::constants::MAX_BATCH_SIZE;
use shared::errors::Error;
use shared::events::COMMISSION_PAID;
use shared::math;
use shared::types::{CommissionCharge, CoreConfig, PoolParams};
use soroban_sdk::{Address, Env};

use crate::ledger;
use crate::pool;
use crate::storage::{self, LedgerScope};

/// Check whether commission may be collected from `holder` in the current epoch
pub fn is_due(env: &Env, params: &PoolParams, config: &CoreConfig, holder: &Address) -> Result<bool, Error> {
    if *holder == params.trader {
        return Ok(false);
    }
    let unlock_epoch = storage::get_investor(env, holder).commission_unlock_epoch;
    if unlock_epoch == 0 {
        return Ok(false);
    }
    Ok(pool::current_epoch(env, params, config)? >= unlock_epoch)
}

/// Commission owed by `holder` in a pool worth `total_value` with `supply` shares
///
/// Ignores the epoch gate; callers check `is_due` first.
pub fn assess(
    env: &Env,
    params: &PoolParams,
    config: &CoreConfig,
    holder: &Address,
    total_value: i128,
    supply: i128,
) -> Result<CommissionCharge, Error> {
    if *holder == params.trader || supply <= 0 {
        return Ok(CommissionCharge::default());
    }
    let balance = ledger::balance(env, &LedgerScope::Pool, holder);
    if balance == 0 {
        return Ok(CommissionCharge::default());
    }

    let info = storage::get_investor(env, holder);
    let value = math::mul_div(env, balance, total_value, supply)?;
    let gain = value - info.invested_base.max(info.high_water_mark);
    if gain <= 0 {
        return Ok(CommissionCharge::default());
    }

    let period = params.commission_period as u32;
    let cap = config
        .max_trader_commissions
        .get(period)
        .ok_or(Error::InvParams)?;
    let fraction = math::commission_fraction(
        params.commission_percentage,
        cap,
        config.min_trader_commission,
    );
    let fee = math::percentage(env, gain, fraction)?;
    let minted = math::dilution_shares(env, fee, supply, total_value)?;
    if minted == 0 {
        return Ok(CommissionCharge::default());
    }

    let (trader_shares, treasury_shares, dividends_shares, insurance_shares) =
        math::split_commission(
            env,
            minted,
            config.dexe_commission_percentage,
            config
                .dexe_commission_distribution
                .get(1)
                .ok_or(Error::InvParams)?,
            config
                .dexe_commission_distribution
                .get(2)
                .ok_or(Error::InvParams)?,
        )?;

    Ok(CommissionCharge {
        base_commission: fee,
        trader_shares,
        treasury_shares,
        dividends_shares,
        insurance_shares,
    })
}

/// Charge `holder` and mint the commission shares
///
/// A zero charge leaves every record untouched.
pub fn collect(
    env: &Env,
    params: &PoolParams,
    config: &CoreConfig,
    holder: &Address,
    total_value: i128,
    supply: i128,
) -> Result<CommissionCharge, Error> {
    let charge = assess(env, params, config, holder, total_value, supply)?;
    let minted = charge.total_shares()?;
    if minted == 0 {
        return Ok(charge);
    }

    let balance = ledger::balance(env, &LedgerScope::Pool, holder);

    pay(env, params, config, &params.trader, charge.trader_shares, &charge)?;
    pay(env, params, config, &config.treasury, charge.treasury_shares, &charge)?;
    pay(env, params, config, &config.dividends, charge.dividends_shares, &charge)?;
    pay(env, params, config, &config.insurance, charge.insurance_shares, &charge)?;

    let mut info = storage::get_investor(env, holder);
    info.high_water_mark = math::mul_div(env, balance, total_value, math::add(supply, minted)?)?;
    info.commission_unlock_epoch += 1;
    storage::set_investor(env, holder, &info);

    env.events().publish(
        (COMMISSION_PAID,),
        (holder.clone(), charge.base_commission, minted),
    );

    Ok(charge)
}

/// Credit a recipient with commission shares and the base value they carry
fn pay(
    env: &Env,
    params: &PoolParams,
    config: &CoreConfig,
    recipient: &Address,
    shares: i128,
    charge: &CommissionCharge,
) -> Result<(), Error> {
    if shares == 0 {
        return Ok(());
    }
    let principal = math::mul_div(env, charge.base_commission, shares, charge.total_shares()?)?;
    pool::credit_shares(env, params, config, recipient, shares, principal)
}

fn batch_bounds(env: &Env, offset: u32, limit: u32) -> Result<(u32, u32), Error> {
    if limit == 0 || limit > MAX_BATCH_SIZE {
        return Err(Error::InvInput);
    }
    let count = storage::get_investors_count(env);
    if offset >= count {
        return Err(Error::OutOfRange);
    }
    Ok((offset, offset.saturating_add(limit).min(count)))
}

/// Commission `reinvest` would collect over registry slots `[offset, offset + limit)`
pub fn quote_reinvest(env: &Env, offset: u32, limit: u32) -> Result<CommissionCharge, Error> {
    let params = storage::get_params(env)?;
    let config = pool::load_config(env)?;
    let (start, end) = batch_bounds(env, offset, limit)?;

    let total_value = pool::valuation(env, &params)?.total_value;
    let mut supply = ledger::supply(env, &LedgerScope::Pool);
    let mut total = CommissionCharge::default();

    for index in start..end {
        let holder = storage::get_investor_at(env, index)?;
        if !is_due(env, &params, &config, &holder)? {
            continue;
        }
        let charge = assess(env, &params, &config, &holder, total_value, supply)?;
        supply = math::add(supply, charge.total_shares()?)?;
        total.absorb(&charge)?;
    }

    Ok(total)
}

/// Collect commission from every due holder in registry slots
/// `[offset, offset + limit)`
pub fn reinvest(env: &Env, offset: u32, limit: u32) -> Result<CommissionCharge, Error> {
    let params = storage::get_params(env)?;
    let config = pool::load_config(env)?;
    let (start, end) = batch_bounds(env, offset, limit)?;

    // value is unchanged by minting, only the supply moves
    let total_value = pool::valuation(env, &params)?.total_value;
    let mut supply = ledger::supply(env, &LedgerScope::Pool);
    let mut total = CommissionCharge::default();

    for index in start..end {
        let holder = storage::get_investor_at(env, index)?;
        if !is_due(env, &params, &config, &holder)? {
            continue;
        }
        let charge = collect(env, &params, &config, &holder, total_value, supply)?;
        supply = math::add(supply, charge.total_shares()?)?;
        total.absorb(&charge)?;
    }

    if total.total_shares()? == 0 {
        return Err(Error::NoCommission);
    }
    Ok(total)
}

use shared::constants::{COMMISSION_PERIODS, MAX_BASE_DECIMALS, PERCENTAGE_100, PROTOCOL_RECIPIENTS};
use shared::errors::Error;
use shared::types::{CoreConfig, PoolKind, PoolParams, PoolState, ProposalLimits};
use soroban_sdk::{Address, Env};

use crate::pool;
use crate::storage;

/// Validate that the caller is the pool's trader
pub fn require_trader(params: &PoolParams, caller: &Address) -> Result<(), Error> {
    if params.trader == *caller {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}

pub fn require_kind(params: &PoolParams, kind: PoolKind) -> Result<(), Error> {
    if params.kind == kind {
        Ok(())
    } else {
        Err(Error::WrongPoolKind)
    }
}

/// Validate pool parameters against the global configuration
pub fn validate_pool_params(params: &PoolParams, config: &CoreConfig) -> Result<(), Error> {
    if params.base_decimals > MAX_BASE_DECIMALS
        || params.total_lp_emission < 0
        || params.minimal_investment < 0
    {
        return Err(Error::InvParams);
    }

    if config.commission_durations.len() != COMMISSION_PERIODS
        || config.max_trader_commissions.len() != COMMISSION_PERIODS
        || config.dexe_commission_distribution.len() != PROTOCOL_RECIPIENTS
    {
        return Err(Error::InvParams);
    }
    if config.commission_durations.iter().any(|duration| duration == 0) {
        return Err(Error::InvParams);
    }
    let distribution: i128 = config.dexe_commission_distribution.iter().sum();
    if distribution > PERCENTAGE_100 || config.dexe_commission_percentage > PERCENTAGE_100 {
        return Err(Error::InvParams);
    }

    let cap = config
        .max_trader_commissions
        .get(params.commission_period as u32)
        .ok_or(Error::InvParams)?;
    if params.commission_percentage < config.min_trader_commission
        || params.commission_percentage > cap
    {
        return Err(Error::InvParams);
    }
    Ok(())
}

/// Private allow-list and investor ceiling for a prospective holder
pub fn check_investor_access(
    env: &Env,
    params: &PoolParams,
    config: &CoreConfig,
    holder: &Address,
) -> Result<(), Error> {
    if *holder == params.trader {
        return Ok(());
    }
    if params.private_pool && !storage::is_private_investor(env, holder) {
        return Err(Error::PrivatePool);
    }
    if storage::is_registered_investor(env, holder) || is_protocol_recipient(config, holder) {
        return Ok(());
    }
    if counted_investors(env, config) >= config.max_pool_investors {
        return Err(Error::InvestorsLim);
    }
    Ok(())
}

fn is_protocol_recipient(config: &CoreConfig, holder: &Address) -> bool {
    *holder == config.treasury || *holder == config.dividends || *holder == config.insurance
}

/// Registered holders that occupy an investor slot
///
/// Commission recipients sit in the registry so they can be charged, but
/// never count against the ceiling.
fn counted_investors(env: &Env, config: &CoreConfig) -> u32 {
    let recipients = [&config.treasury, &config.dividends, &config.insurance];
    let registered = recipients
        .iter()
        .enumerate()
        .filter(|(i, recipient)| {
            !recipients[..*i].contains(recipient) && storage::is_registered_investor(env, recipient)
        })
        .count() as u32;
    storage::get_investors_count(env).saturating_sub(registered)
}

pub fn check_invest(
    env: &Env,
    params: &PoolParams,
    state: &PoolState,
    config: &CoreConfig,
    investor: &Address,
    amount: i128,
    supply: i128,
) -> Result<(), Error> {
    let is_trader = *investor == params.trader;

    // the trader seeds an empty pool with any amount
    if amount < params.minimal_investment && !(is_trader && supply == 0) {
        return Err(Error::UnderInvest);
    }

    check_investor_access(env, params, config, investor)?;

    if params.kind == PoolKind::Invest && !is_trader {
        let delay = config.delay_for_risky_pool;
        let open = delay == 0
            || (state.first_exchange != 0
                && env.ledger().timestamp() >= state.first_exchange.saturating_add(delay));
        if !open {
            return Err(Error::InvestDelay);
        }
    }
    Ok(())
}

pub fn check_emission(params: &PoolParams, supply: i128, minted: i128) -> Result<(), Error> {
    if params.total_lp_emission > 0 && supply.saturating_add(minted) > params.total_lp_emission {
        return Err(Error::EmissionLim);
    }
    Ok(())
}

/// Whitelist and open-position rules of a pool exchange
pub fn check_exchange_tokens(
    env: &Env,
    params: &PoolParams,
    from: &Address,
    to: &Address,
) -> Result<(), Error> {
    let base = &params.base_token;
    let from_open = *from != *base && storage::get_position_balance(env, from) > 0;
    let closing = *to == *base && from_open;

    if !closing {
        for token in [from, to] {
            if token != base && !pool::is_whitelisted(env, token)? {
                return Err(Error::NotWhitelisted);
            }
        }
    }

    if *from != *base && !from_open {
        return Err(Error::PositionNotOpen);
    }
    Ok(())
}

pub fn check_leverage(env: &Env, params: &PoolParams, config: &CoreConfig) -> Result<(), Error> {
    if config.leverage_threshold == 0 {
        return Ok(());
    }
    let info = pool::leverage_info(env, params, config)?;
    if info.positions_value > info.max_leverage {
        return Err(Error::LeverageLim);
    }
    Ok(())
}

/// Validate that a proposal still accepts investments
pub fn check_not_expired(env: &Env, limits: &ProposalLimits) -> Result<(), Error> {
    if limits.timestamp_limit != 0 && env.ledger().timestamp() > limits.timestamp_limit {
        return Err(Error::PropExpired);
    }
    Ok(())
}

pub fn check_invested_cap(limits: &ProposalLimits, invested_base: i128, added: i128) -> Result<(), Error> {
    if limits.max_invested_base != 0 && invested_base.saturating_add(added) > limits.max_invested_base {
        return Err(Error::PropCap);
    }
    Ok(())
}

pub fn check_token_price(
    env: &Env,
    params: &PoolParams,
    token: &Address,
    limits: &ProposalLimits,
) -> Result<(), Error> {
    if limits.max_token_price != 0 && pool::token_price(env, params, token)? > limits.max_token_price {
        return Err(Error::PriceTooHigh);
    }
    Ok(())
}

/// An investor may never hold more of a proposal than the trader
pub fn check_exposure(
    params: &PoolParams,
    holder: &Address,
    holder_balance: i128,
    trader_balance: i128,
) -> Result<(), Error> {
    if *holder == params.trader {
        return Ok(());
    }
    if holder_balance > trader_balance {
        return Err(Error::MoreThanTrader);
    }
    Ok(())
}

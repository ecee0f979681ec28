//! Base pool engine: holdings, share issuance and redemption, trading.
//!
//! Holdings are tracked internally. The base token balance lives in
//! `PoolState::base_balance`, every open position in `PositionBalance(token)`.
//! Proposal assets sit on the same contract address and are never counted here.

use shared::constants::PRICE_UNIT;
use shared::errors::Error;
use shared::events::{DIVESTED, EXCHANGED, INVESTED, POSITION_CLOSED};
use shared::interfaces::{CorePropertiesClient, PriceFeedClient};
use shared::math;
use shared::types::{
    CommissionCharge, CoreConfig, DivestQuote, ExchangeType, InvestQuote, InvestorInfo,
    LeverageInfo, PoolParams, ProposalHolder, Valuation,
};
use soroban_sdk::{log, token::TokenClient, Address, Env, Vec};

use crate::commission;
use crate::ledger;
use crate::storage::{self, LedgerScope};
use crate::validation;

// ==================== Collaborators ====================

/// Fetch the global configuration from the core properties contract
pub fn load_config(env: &Env) -> Result<CoreConfig, Error> {
    let address = storage::get_core_properties(env)?;
    Ok(CorePropertiesClient::new(env, &address).get_core_config())
}

pub fn is_whitelisted(env: &Env, token: &Address) -> Result<bool, Error> {
    let address = storage::get_core_properties(env)?;
    Ok(CorePropertiesClient::new(env, &address).is_whitelisted_token(token))
}

/// Amount of `to` received for `amount` of `from`
pub fn quote(env: &Env, from: &Address, to: &Address, amount: i128) -> Result<i128, Error> {
    if amount == 0 || from == to {
        return Ok(amount);
    }
    let feed = storage::get_price_feed(env)?;
    let out = PriceFeedClient::new(env, &feed).quote(from, to, &amount);
    if out < 0 {
        return Err(Error::BadQuote);
    }
    Ok(out)
}

/// Amount of `from` needed to receive `amount_out` of `to`
pub fn quote_in(env: &Env, from: &Address, to: &Address, amount_out: i128) -> Result<i128, Error> {
    if amount_out == 0 || from == to {
        return Ok(amount_out);
    }
    let feed = storage::get_price_feed(env)?;
    let needed = PriceFeedClient::new(env, &feed).quote_in(from, to, &amount_out);
    if needed <= 0 {
        return Err(Error::BadQuote);
    }
    Ok(needed)
}

/// Sell exactly `amount` of `from` through the router
pub fn swap(env: &Env, from: &Address, to: &Address, amount: i128, min_out: i128) -> Result<i128, Error> {
    if amount == 0 {
        if min_out > 0 {
            return Err(Error::Slippage);
        }
        return Ok(0);
    }

    let feed = storage::get_price_feed(env)?;
    let this = env.current_contract_address();
    TokenClient::new(env, from).transfer(&this, &feed, &amount);
    let received = PriceFeedClient::new(env, &feed).swap(&this, from, to, &amount, &min_out);
    if received < min_out {
        return Err(Error::Slippage);
    }
    Ok(received)
}

/// Base token price of one whole unit of `token`
pub fn token_price(env: &Env, params: &PoolParams, token: &Address) -> Result<i128, Error> {
    quote(env, token, &params.base_token, PRICE_UNIT)
}

/// Index of the current commission epoch
pub fn current_epoch(env: &Env, params: &PoolParams, config: &CoreConfig) -> Result<u64, Error> {
    let duration = config
        .commission_durations
        .get(params.commission_period as u32)
        .ok_or(Error::InvParams)?;
    Ok(math::epoch_of(env.ledger().timestamp(), duration))
}

pub(crate) fn nth(values: &Vec<i128>, index: u32) -> Result<i128, Error> {
    values.get(index).ok_or(Error::LenMismatch)
}

// ==================== Holdings ====================

/// Internal balance of base token or a position
pub fn holding(env: &Env, params: &PoolParams, token: &Address) -> Result<i128, Error> {
    if *token == params.base_token {
        return Ok(storage::get_state(env)?.base_balance);
    }
    Ok(storage::get_position_balance(env, token))
}

/// Move a holding by `delta`, opening or closing the position as it crosses zero
pub fn adjust_holding(env: &Env, params: &PoolParams, token: &Address, delta: i128) -> Result<(), Error> {
    if delta == 0 {
        return Ok(());
    }

    if *token == params.base_token {
        let mut state = storage::get_state(env)?;
        state.base_balance = next_holding(state.base_balance, delta)?;
        storage::set_state(env, &state);
        return Ok(());
    }

    let previous = storage::get_position_balance(env, token);
    let balance = next_holding(previous, delta)?;
    storage::set_position_balance(env, token, balance);

    let mut positions = storage::get_positions(env);
    if previous == 0 && balance > 0 {
        positions.push_back(token.clone());
        storage::set_positions(env, &positions);
    } else if previous > 0 && balance == 0 {
        if let Some(index) = positions.first_index_of(token) {
            positions.remove(index);
        }
        storage::set_positions(env, &positions);
        env.events().publish((POSITION_CLOSED,), token.clone());
    }
    Ok(())
}

fn next_holding(current: i128, delta: i128) -> Result<i128, Error> {
    let next = math::add(current, delta)?;
    if next < 0 {
        return Err(Error::InsufBalance);
    }
    Ok(next)
}

/// Value the pool's holdings in base token
pub fn valuation(env: &Env, params: &PoolParams) -> Result<Valuation, Error> {
    let state = storage::get_state(env)?;
    let positions = storage::get_positions(env);

    let mut position_balances = Vec::new(env);
    let mut position_values = Vec::new(env);
    let mut total_value = state.base_balance;

    for token in positions.iter() {
        let balance = storage::get_position_balance(env, &token);
        let value = quote(env, &token, &params.base_token, balance)?;
        total_value = math::add(total_value, value)?;
        position_balances.push_back(balance);
        position_values.push_back(value);
    }

    Ok(Valuation {
        total_value,
        base_balance: state.base_balance,
        positions,
        position_balances,
        position_values,
    })
}

/// Shares issued for `amount` of base value at the current price per share
pub fn shares_for(env: &Env, amount: i128, supply: i128, total_value: i128) -> Result<i128, Error> {
    if supply == 0 {
        return Ok(amount);
    }
    if total_value <= 0 {
        return Err(Error::ZeroValue);
    }
    math::mul_div(env, amount, supply, total_value)
}

// ==================== Share bookkeeping ====================

/// Mint pool shares carrying `principal` of invested base
pub fn credit_shares(
    env: &Env,
    params: &PoolParams,
    config: &CoreConfig,
    holder: &Address,
    lp_amount: i128,
    principal: i128,
) -> Result<(), Error> {
    let transition = ledger::mint(env, &LedgerScope::Pool, holder, lp_amount)?;
    let mut info = storage::get_investor(env, holder);

    if transition.opened {
        info.commission_unlock_epoch = current_epoch(env, params, config)? + 1;
        if *holder != params.trader {
            storage::add_investor(env, holder);
        }
    }

    info.invested_base = math::add(info.invested_base, principal)?;
    info.high_water_mark = math::add(info.high_water_mark, principal)?;
    storage::set_investor(env, holder, &info);
    Ok(())
}

/// Burn pool shares and return the principal released with them
pub fn debit_shares(env: &Env, holder: &Address, lp_amount: i128) -> Result<i128, Error> {
    if lp_amount == 0 {
        return Ok(0);
    }
    let balance = ledger::balance(env, &LedgerScope::Pool, holder);
    if balance < lp_amount {
        return Err(Error::InsufShares);
    }

    let remaining = balance - lp_amount;
    let mut info = storage::get_investor(env, holder);
    let kept = math::mul_div(env, info.invested_base, remaining, balance)?;
    let released = info.invested_base - kept;
    info.invested_base = kept;
    info.high_water_mark = math::mul_div(env, info.high_water_mark, remaining, balance)?;

    let transition = ledger::burn(env, &LedgerScope::Pool, holder, lp_amount)?;
    if transition.closed {
        info = InvestorInfo::default();
        storage::remove_investor(env, holder);
    }
    storage::set_investor(env, holder, &info);
    Ok(released)
}

// ==================== Invest ====================

/// Split of an investment across the pool's holdings
pub fn quote_invest(env: &Env, params: &PoolParams, amount: i128) -> Result<InvestQuote, Error> {
    let valuation = valuation(env, params)?;
    let supply = ledger::supply(env, &LedgerScope::Pool);
    let lp_amount = shares_for(env, amount, supply, valuation.total_value)?;

    let mut given_amounts = Vec::new(env);
    let mut received_amounts = Vec::new(env);
    let mut base_kept = amount;

    for (i, token) in valuation.positions.iter().enumerate() {
        let part = if valuation.total_value > 0 {
            math::mul_div(env, amount, nth(&valuation.position_values, i as u32)?, valuation.total_value)?
        } else {
            0
        };
        base_kept = math::sub(base_kept, part)?;
        given_amounts.push_back(part);
        received_amounts.push_back(quote(env, &params.base_token, &token, part)?);
    }

    Ok(InvestQuote {
        lp_amount,
        base_kept,
        positions: valuation.positions,
        given_amounts,
        received_amounts,
    })
}

pub fn invest(
    env: &Env,
    investor: &Address,
    amount: i128,
    min_positions_out: &Vec<i128>,
) -> Result<i128, Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }

    let params = storage::get_params(env)?;
    let state = storage::get_state(env)?;
    let config = load_config(env)?;
    let supply = ledger::supply(env, &LedgerScope::Pool);

    validation::check_invest(env, &params, &state, &config, investor, amount, supply)?;

    let quote = quote_invest(env, &params, amount)?;
    if min_positions_out.len() != quote.positions.len() {
        return Err(Error::LenMismatch);
    }
    if quote.lp_amount <= 0 {
        return Err(Error::ZeroValue);
    }
    validation::check_emission(&params, supply, quote.lp_amount)?;

    TokenClient::new(env, &params.base_token).transfer(
        investor,
        &env.current_contract_address(),
        &amount,
    );
    adjust_holding(env, &params, &params.base_token, amount)?;

    for (i, token) in quote.positions.iter().enumerate() {
        let given = nth(&quote.given_amounts, i as u32)?;
        if given == 0 {
            continue;
        }
        let received = swap(
            env,
            &params.base_token,
            &token,
            given,
            nth(min_positions_out, i as u32)?,
        )?;
        adjust_holding(env, &params, &params.base_token, -given)?;
        adjust_holding(env, &params, &token, received)?;
    }

    credit_shares(env, &params, &config, investor, quote.lp_amount, amount)?;

    env.events()
        .publish((INVESTED,), (investor.clone(), amount, quote.lp_amount));

    Ok(quote.lp_amount)
}

// ==================== Divest ====================

/// Commission owed by `investor` before a divest, if its epoch has elapsed
fn divest_commission(
    env: &Env,
    params: &PoolParams,
    config: &CoreConfig,
    investor: &Address,
    total_value: i128,
    supply: i128,
) -> Result<CommissionCharge, Error> {
    if commission::is_due(env, params, config, investor)? {
        commission::assess(env, params, config, investor, total_value, supply)
    } else {
        Ok(CommissionCharge::default())
    }
}

pub fn quote_divest(env: &Env, investor: &Address, lp_amount: i128) -> Result<DivestQuote, Error> {
    if lp_amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    let params = storage::get_params(env)?;
    let config = load_config(env)?;
    if ledger::balance(env, &LedgerScope::Pool, investor) < lp_amount {
        return Err(Error::InsufShares);
    }

    let valuation = valuation(env, &params)?;
    let supply = ledger::supply(env, &LedgerScope::Pool);
    let commission = divest_commission(env, &params, &config, investor, valuation.total_value, supply)?;
    let supply_after = math::add(supply, commission.total_shares()?)?;

    let mut position_amounts = Vec::new(env);
    let mut position_values = Vec::new(env);
    for (i, token) in valuation.positions.iter().enumerate() {
        let amount = math::mul_div(env, nth(&valuation.position_balances, i as u32)?, lp_amount, supply_after)?;
        position_amounts.push_back(amount);
        position_values.push_back(quote(env, &token, &params.base_token, amount)?);
    }

    Ok(DivestQuote {
        base_amount: math::mul_div(env, valuation.base_balance, lp_amount, supply_after)?,
        positions: valuation.positions,
        position_amounts,
        position_values,
        commission,
    })
}

/// Redeem shares for a proportional slice of every holding
///
/// Returns the base token paid out.
pub fn divest(
    env: &Env,
    investor: &Address,
    lp_amount: i128,
    min_positions_out: &Vec<i128>,
    liquidate: bool,
) -> Result<i128, Error> {
    if lp_amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    let params = storage::get_params(env)?;
    let config = load_config(env)?;
    if ledger::balance(env, &LedgerScope::Pool, investor) < lp_amount {
        return Err(Error::InsufShares);
    }

    let valuation = valuation(env, &params)?;
    let supply = ledger::supply(env, &LedgerScope::Pool);
    if commission::is_due(env, &params, &config, investor)? {
        commission::collect(env, &params, &config, investor, valuation.total_value, supply)?;
    }
    let supply = ledger::supply(env, &LedgerScope::Pool);

    if liquidate && min_positions_out.len() != valuation.positions.len() {
        return Err(Error::LenMismatch);
    }

    let base_part = math::mul_div(env, valuation.base_balance, lp_amount, supply)?;
    debit_shares(env, investor, lp_amount)?;
    adjust_holding(env, &params, &params.base_token, -base_part)?;

    let this = env.current_contract_address();
    let mut base_out = base_part;
    for (i, token) in valuation.positions.iter().enumerate() {
        let amount = math::mul_div(env, nth(&valuation.position_balances, i as u32)?, lp_amount, supply)?;
        if amount == 0 {
            continue;
        }
        adjust_holding(env, &params, &token, -amount)?;

        if liquidate {
            let received = swap(
                env,
                &token,
                &params.base_token,
                amount,
                nth(min_positions_out, i as u32)?,
            )?;
            base_out = math::add(base_out, received)?;
        } else {
            TokenClient::new(env, &token).transfer(&this, investor, &amount);
        }
    }

    if base_out > 0 {
        TokenClient::new(env, &params.base_token).transfer(&this, investor, &base_out);
    }

    env.events()
        .publish((DIVESTED,), (investor.clone(), lp_amount, base_out));

    Ok(base_out)
}

// ==================== Exchange ====================

pub fn quote_exchange(
    env: &Env,
    from: &Address,
    to: &Address,
    amount: i128,
    exchange_type: ExchangeType,
) -> Result<i128, Error> {
    match exchange_type {
        ExchangeType::FromExact => quote(env, from, to, amount),
        ExchangeType::ToExact => quote_in(env, from, to, amount),
    }
}

/// Trade between pool holdings
///
/// Returns `(spent, received)`.
pub fn exchange(
    env: &Env,
    from: &Address,
    to: &Address,
    amount: i128,
    amount_bound: i128,
    exchange_type: ExchangeType,
) -> Result<(i128, i128), Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    if from == to {
        return Err(Error::SameToken);
    }

    let params = storage::get_params(env)?;
    let config = load_config(env)?;
    validation::check_exchange_tokens(env, &params, from, to)?;

    let available = holding(env, &params, from)?;
    let (spent, received) = match exchange_type {
        ExchangeType::FromExact => {
            if available < amount {
                return Err(Error::InsufBalance);
            }
            (amount, swap(env, from, to, amount, amount_bound)?)
        }
        ExchangeType::ToExact => {
            let needed = quote_in(env, from, to, amount)?;
            if needed > amount_bound {
                return Err(Error::Slippage);
            }
            if available < needed {
                return Err(Error::InsufBalance);
            }
            (needed, swap(env, from, to, needed, amount)?)
        }
    };

    adjust_holding(env, &params, from, -spent)?;
    adjust_holding(env, &params, to, received)?;

    if storage::get_positions(env).len() > config.max_open_positions {
        return Err(Error::PositionsLim);
    }
    if *to != params.base_token {
        validation::check_leverage(env, &params, &config)?;
    }

    let mut state = storage::get_state(env)?;
    if state.first_exchange == 0 {
        state.first_exchange = env.ledger().timestamp();
        storage::set_state(env, &state);
    }

    log!(env, "exchange {} -> {}", spent, received);
    env.events()
        .publish((EXCHANGED,), (from.clone(), to.clone(), spent, received));

    Ok((spent, received))
}

/// Open-position value against the leverage allowance of the whole pool
pub fn leverage_info(env: &Env, params: &PoolParams, config: &CoreConfig) -> Result<LeverageInfo, Error> {
    let valuation = valuation(env, params)?;
    let positions_value = math::sub(valuation.total_value, valuation.base_balance)?;

    if config.leverage_threshold == 0 {
        return Ok(LeverageInfo {
            positions_value,
            max_leverage: 0,
        });
    }

    Ok(LeverageInfo {
        positions_value,
        max_leverage: math::max_leverage(
            valuation.total_value,
            config.leverage_threshold,
            config.leverage_slope,
        )?,
    })
}

// ==================== Transfer ====================

/// Move shares together with their share of principal and high-water mark
pub fn transfer(env: &Env, from: &Address, to: &Address, amount: i128) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    let params = storage::get_params(env)?;
    let config = load_config(env)?;
    validation::check_investor_access(env, &params, &config, to)?;

    let balance = ledger::balance(env, &LedgerScope::Pool, from);
    if balance < amount {
        return Err(Error::InsufShares);
    }

    let remaining = balance - amount;
    let mut from_info = storage::get_investor(env, from);
    let kept_base = math::mul_div(env, from_info.invested_base, remaining, balance)?;
    let kept_mark = math::mul_div(env, from_info.high_water_mark, remaining, balance)?;
    let moved_base = from_info.invested_base - kept_base;
    let moved_mark = from_info.high_water_mark - kept_mark;

    let transition = ledger::transfer(env, &LedgerScope::Pool, from, to, amount)?;

    from_info.invested_base = kept_base;
    from_info.high_water_mark = kept_mark;
    if transition.closed {
        from_info = InvestorInfo::default();
        storage::remove_investor(env, from);
    }
    storage::set_investor(env, from, &from_info);

    let mut to_info = storage::get_investor(env, to);
    if transition.opened {
        to_info.commission_unlock_epoch = current_epoch(env, &params, &config)? + 1;
        if *to != params.trader {
            storage::add_investor(env, to);
        }
    }
    to_info.invested_base = math::add(to_info.invested_base, moved_base)?;
    to_info.high_water_mark = math::add(to_info.high_water_mark, moved_mark)?;
    storage::set_investor(env, to, &to_info);

    Ok(())
}

// ==================== Proposal support ====================

/// Base token released by locking `lp_amount` shares, and the liquidation
/// value of every position slice
pub fn quote_lock(env: &Env, params: &PoolParams, lp_amount: i128) -> Result<(i128, Vec<i128>), Error> {
    let valuation = valuation(env, params)?;
    let supply = ledger::supply(env, &LedgerScope::Pool);
    if supply == 0 {
        return Err(Error::InsufShares);
    }

    let mut base_amount = math::mul_div(env, valuation.base_balance, lp_amount, supply)?;
    let mut values = Vec::new(env);
    for (i, token) in valuation.positions.iter().enumerate() {
        let amount = math::mul_div(env, nth(&valuation.position_balances, i as u32)?, lp_amount, supply)?;
        let value = quote(env, &token, &params.base_token, amount)?;
        base_amount = math::add(base_amount, value)?;
        values.push_back(value);
    }
    Ok((base_amount, values))
}

/// Burn `lp_amount` of the holder's shares and turn their slice of every
/// holding into base token for a proposal
///
/// Returns `(base_amount, principal)`. No commission is taken.
pub fn lock_shares(
    env: &Env,
    params: &PoolParams,
    holder: &Address,
    lp_amount: i128,
    min_positions_out: &Vec<i128>,
) -> Result<(i128, i128), Error> {
    if lp_amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    if ledger::balance(env, &LedgerScope::Pool, holder) < lp_amount {
        return Err(Error::InsufShares);
    }

    let valuation = valuation(env, params)?;
    if min_positions_out.len() != valuation.positions.len() {
        return Err(Error::LenMismatch);
    }
    let supply = ledger::supply(env, &LedgerScope::Pool);

    let base_part = math::mul_div(env, valuation.base_balance, lp_amount, supply)?;
    let principal = debit_shares(env, holder, lp_amount)?;
    adjust_holding(env, params, &params.base_token, -base_part)?;

    let mut base_amount = base_part;
    for (i, token) in valuation.positions.iter().enumerate() {
        let amount = math::mul_div(env, nth(&valuation.position_balances, i as u32)?, lp_amount, supply)?;
        if amount == 0 {
            continue;
        }
        adjust_holding(env, params, &token, -amount)?;
        let received = swap(
            env,
            &token,
            &params.base_token,
            amount,
            nth(min_positions_out, i as u32)?,
        )?;
        base_amount = math::add(base_amount, received)?;
    }

    let mut state = storage::get_state(env)?;
    state.total_locked_lp = math::add(state.total_locked_lp, lp_amount)?;
    storage::set_state(env, &state);

    Ok((base_amount, principal))
}

/// Return `base_amount` from a proposal to the pool as freshly minted shares
///
/// `principal` follows the shares back into the holder's record and
/// `lp_unlocked` is released from the locked total. Commission is taken
/// afterwards when the holder's epoch has elapsed.
pub fn unlock_to_shares(
    env: &Env,
    params: &PoolParams,
    holder: &Address,
    base_amount: i128,
    principal: i128,
    lp_unlocked: i128,
) -> Result<i128, Error> {
    let config = load_config(env)?;
    let valuation = valuation(env, params)?;
    let supply = ledger::supply(env, &LedgerScope::Pool);
    let minted = shares_for(env, base_amount, supply, valuation.total_value)?;

    adjust_holding(env, params, &params.base_token, base_amount)?;

    let mut state = storage::get_state(env)?;
    state.total_locked_lp = math::sub(state.total_locked_lp, lp_unlocked)?;
    storage::set_state(env, &state);

    if minted > 0 {
        credit_shares(env, params, &config, holder, minted, principal)?;
    }

    if commission::is_due(env, params, &config, holder)? {
        commission::collect(
            env,
            params,
            &config,
            holder,
            math::add(valuation.total_value, base_amount)?,
            math::add(supply, minted)?,
        )?;
    }

    Ok(minted)
}

/// Detach the part of a lock record backing `amount` of `balance` proposal shares
///
/// Returns `(locked_lp, principal)`.
pub fn take_lock_share(env: &Env, record: &mut ProposalHolder, amount: i128, balance: i128) -> Result<(i128, i128), Error> {
    let locked_lp = math::mul_div(env, record.locked_lp, amount, balance)?;
    let principal = math::mul_div(env, record.invested_base, amount, balance)?;
    record.locked_lp -= locked_lp;
    record.invested_base -= principal;
    Ok((locked_lp, principal))
}

//! Risky proposals: single-position sub-pools traded by the trader.
//!
//! Proposal shares are issued against the proposal's value, so late entrants
//! pay the current price of the position. Every holder keeps a lock record of
//! the pool shares and principal it moved in.

use shared::constants::{MAX_BATCH_SIZE, PERCENTAGE_100};
use shared::errors::Error;
use shared::events::{
    PROPOSAL_CREATED, PROPOSAL_EXCHANGED, PROPOSAL_INVESTED, PROPOSAL_REINVESTED, PROPOSAL_TRANSFER,
};
use shared::math;
use shared::types::{
    ExchangeType, PoolKind, PoolParams, ProposalDivestQuote, ProposalInvestQuote, ProposalLimits,
    RiskyProposal,
};
use soroban_sdk::{Address, Env, Vec};

use crate::ledger;
use crate::pool;
use crate::storage::{self, LedgerScope};
use crate::validation;

/// Base token value of a proposal's holdings
pub fn proposal_value(env: &Env, params: &PoolParams, proposal: &RiskyProposal) -> Result<i128, Error> {
    let position_value = pool::quote(env, &proposal.token, &params.base_token, proposal.balance_position)?;
    math::add(proposal.balance_base, position_value)
}

/// Keep the pool's single risky token scope in step with proposal supplies
fn track_supply(env: &Env, token: &Address, before: i128, after: i128) -> Result<(), Error> {
    let mut state = storage::get_state(env)?;
    if before == 0 && after > 0 {
        state.live_risky_proposals += 1;
        state.risky_token = Some(token.clone());
    } else if before > 0 && after == 0 {
        state.live_risky_proposals = state.live_risky_proposals.saturating_sub(1);
        if state.live_risky_proposals == 0 {
            state.risky_token = None;
        }
    } else {
        return Ok(());
    }
    storage::set_state(env, &state);
    Ok(())
}

/// Only one token may back the proposals that have holders
fn check_token_scope(env: &Env, token: &Address) -> Result<(), Error> {
    let state = storage::get_state(env)?;
    match state.risky_token {
        Some(current) if state.live_risky_proposals > 0 && current != *token => Err(Error::WrongPropToken),
        _ => Ok(()),
    }
}

/// Entry into a proposal: `(shares, position_given)` for `base_amount`
fn entry_split(
    env: &Env,
    params: &PoolParams,
    proposal_id: u32,
    proposal: &RiskyProposal,
    base_amount: i128,
) -> Result<(i128, i128), Error> {
    let supply = ledger::supply(env, &LedgerScope::Proposal(proposal_id));
    let value = proposal_value(env, params, proposal)?;

    if supply == 0 {
        return Ok((base_amount, 0));
    }
    if value <= 0 {
        return Err(Error::ZeroValue);
    }

    let shares = math::mul_div(env, base_amount, supply, value)?;
    let position_value = math::sub(value, proposal.balance_base)?;
    let position_given = math::mul_div(env, base_amount, position_value, value)?;
    Ok((shares, position_given))
}

fn add_lock(env: &Env, proposal_id: u32, holder: &Address, locked_lp: i128, principal: i128) -> Result<(), Error> {
    let mut record = storage::get_proposal_holder(env, proposal_id, holder);
    record.locked_lp = math::add(record.locked_lp, locked_lp)?;
    record.invested_base = math::add(record.invested_base, principal)?;
    storage::set_proposal_holder(env, proposal_id, holder, &record);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    env: &Env,
    params: &PoolParams,
    trader: &Address,
    token: &Address,
    lp_amount: i128,
    limits: ProposalLimits,
    instant_trade_percentage: i128,
    min_divest_out: &Vec<i128>,
    min_position_out: i128,
) -> Result<u32, Error> {
    validation::require_kind(params, PoolKind::Basic)?;

    if *token == params.base_token {
        return Err(Error::WrongPropToken);
    }
    check_token_scope(env, token)?;
    if !(0..=PERCENTAGE_100).contains(&instant_trade_percentage) {
        return Err(Error::InvInput);
    }
    validation::check_token_price(env, params, token, &limits)?;

    let (base_amount, principal) = pool::lock_shares(env, params, trader, lp_amount, min_divest_out)?;
    if base_amount <= 0 {
        return Err(Error::ZeroValue);
    }

    let position_given = math::percentage(env, base_amount, instant_trade_percentage)?;
    let position_received = pool::swap(env, &params.base_token, token, position_given, min_position_out)?;

    let mut state = storage::get_state(env)?;
    let proposal_id = state.proposals_count + 1;
    state.proposals_count = proposal_id;
    storage::set_state(env, &state);

    let proposal = RiskyProposal {
        token: token.clone(),
        limits,
        balance_base: base_amount - position_given,
        balance_position: position_received,
        invested_base: base_amount,
        locked_lp: lp_amount,
    };
    storage::set_risky_proposal(env, proposal_id, &proposal);

    ledger::mint_proposal(env, proposal_id, trader, base_amount)?;
    track_supply(env, token, 0, base_amount)?;
    add_lock(env, proposal_id, trader, lp_amount, principal)?;

    env.events().publish(
        (PROPOSAL_CREATED,),
        (proposal_id, trader.clone(), token.clone(), base_amount),
    );

    Ok(proposal_id)
}

pub fn quote_invest(
    env: &Env,
    params: &PoolParams,
    proposal_id: u32,
    lp_amount: i128,
) -> Result<ProposalInvestQuote, Error> {
    let proposal = storage::get_risky_proposal(env, proposal_id)?;
    let (base_amount, pool_position_values) = pool::quote_lock(env, params, lp_amount)?;
    let (proposal_shares, position_given) = entry_split(env, params, proposal_id, &proposal, base_amount)?;

    Ok(ProposalInvestQuote {
        base_amount,
        pool_position_values,
        proposal_shares,
        base_kept: base_amount - position_given,
        position_given,
        position_received: pool::quote(env, &params.base_token, &proposal.token, position_given)?,
    })
}

pub fn invest(
    env: &Env,
    params: &PoolParams,
    investor: &Address,
    proposal_id: u32,
    lp_amount: i128,
    min_divest_out: &Vec<i128>,
    min_position_out: i128,
) -> Result<i128, Error> {
    validation::require_kind(params, PoolKind::Basic)?;

    let mut proposal = storage::get_risky_proposal(env, proposal_id)?;
    validation::check_not_expired(env, &proposal.limits)?;
    validation::check_token_price(env, params, &proposal.token, &proposal.limits)?;

    let scope = LedgerScope::Proposal(proposal_id);
    // a drained proposal comes back to life
    if ledger::supply(env, &scope) == 0 {
        check_token_scope(env, &proposal.token)?;
    }

    let (base_amount, principal) = pool::lock_shares(env, params, investor, lp_amount, min_divest_out)?;
    validation::check_invested_cap(&proposal.limits, proposal.invested_base, base_amount)?;

    let (shares, position_given) = entry_split(env, params, proposal_id, &proposal, base_amount)?;
    if shares <= 0 {
        return Err(Error::ZeroValue);
    }

    validation::check_exposure(
        params,
        investor,
        math::add(ledger::balance(env, &scope, investor), shares)?,
        ledger::balance(env, &scope, &params.trader),
    )?;

    let position_received = pool::swap(
        env,
        &params.base_token,
        &proposal.token,
        position_given,
        min_position_out,
    )?;

    proposal.balance_base = math::add(proposal.balance_base, base_amount - position_given)?;
    proposal.balance_position = math::add(proposal.balance_position, position_received)?;
    proposal.invested_base = math::add(proposal.invested_base, base_amount)?;
    proposal.locked_lp = math::add(proposal.locked_lp, lp_amount)?;
    storage::set_risky_proposal(env, proposal_id, &proposal);

    let supply = ledger::supply(env, &scope);
    ledger::mint_proposal(env, proposal_id, investor, shares)?;
    track_supply(env, &proposal.token, supply, supply + shares)?;
    add_lock(env, proposal_id, investor, lp_amount, principal)?;

    env.events().publish(
        (PROPOSAL_INVESTED,),
        (investor.clone(), proposal_id, lp_amount, shares),
    );

    Ok(shares)
}

/// The other side of a trade inside a proposal
fn counter_token(params: &PoolParams, proposal: &RiskyProposal, from: &Address) -> Result<Address, Error> {
    if *from == params.base_token {
        Ok(proposal.token.clone())
    } else if *from == proposal.token {
        Ok(params.base_token.clone())
    } else {
        Err(Error::InvInput)
    }
}

pub fn quote_exchange(
    env: &Env,
    params: &PoolParams,
    proposal_id: u32,
    from: &Address,
    amount: i128,
    exchange_type: ExchangeType,
) -> Result<i128, Error> {
    let proposal = storage::get_risky_proposal(env, proposal_id)?;
    let to = counter_token(params, &proposal, from)?;
    pool::quote_exchange(env, from, &to, amount, exchange_type)
}

/// Trade between a proposal's base and its position token
///
/// Returns `(spent, received)`.
pub fn exchange(
    env: &Env,
    params: &PoolParams,
    proposal_id: u32,
    from: &Address,
    amount: i128,
    amount_bound: i128,
    exchange_type: ExchangeType,
) -> Result<(i128, i128), Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    let mut proposal = storage::get_risky_proposal(env, proposal_id)?;
    let to = counter_token(params, &proposal, from)?;
    let buying = to == proposal.token;
    if buying {
        validation::check_token_price(env, params, &proposal.token, &proposal.limits)?;
    }

    let available = if buying {
        proposal.balance_base
    } else {
        proposal.balance_position
    };

    let (spent, received) = match exchange_type {
        ExchangeType::FromExact => {
            if available < amount {
                return Err(Error::InsufBalance);
            }
            (amount, pool::swap(env, from, &to, amount, amount_bound)?)
        }
        ExchangeType::ToExact => {
            let needed = pool::quote_in(env, from, &to, amount)?;
            if needed > amount_bound {
                return Err(Error::Slippage);
            }
            if available < needed {
                return Err(Error::InsufBalance);
            }
            (needed, pool::swap(env, from, &to, needed, amount)?)
        }
    };

    if buying {
        proposal.balance_base -= spent;
        proposal.balance_position = math::add(proposal.balance_position, received)?;
    } else {
        proposal.balance_position -= spent;
        proposal.balance_base = math::add(proposal.balance_base, received)?;
    }
    storage::set_risky_proposal(env, proposal_id, &proposal);

    env.events().publish(
        (PROPOSAL_EXCHANGED,),
        (proposal_id, from.clone(), spent, received),
    );

    Ok((spent, received))
}

/// Holdings released by burning `amount` proposal shares, for each id
pub fn quote_divest(
    env: &Env,
    params: &PoolParams,
    proposal_ids: &Vec<u32>,
    amounts: &Vec<i128>,
) -> Result<Vec<ProposalDivestQuote>, Error> {
    if proposal_ids.len() != amounts.len() {
        return Err(Error::LenMismatch);
    }
    if proposal_ids.len() > MAX_BATCH_SIZE {
        return Err(Error::InvInput);
    }

    let mut quotes = Vec::new(env);
    for (i, proposal_id) in proposal_ids.iter().enumerate() {
        let proposal = storage::get_risky_proposal(env, proposal_id)?;
        let supply = ledger::supply(env, &LedgerScope::Proposal(proposal_id));
        let amount = pool::nth(amounts, i as u32)?;
        if amount < 0 || amount > supply {
            return Err(Error::InsufShares);
        }

        let (base_amount, position_amount) = if amount == 0 {
            (0, 0)
        } else {
            (
                math::mul_div(env, proposal.balance_base, amount, supply)?,
                math::mul_div(env, proposal.balance_position, amount, supply)?,
            )
        };
        let position_value = pool::quote(env, &proposal.token, &params.base_token, position_amount)?;

        quotes.push_back(ProposalDivestQuote {
            proposal_id,
            base_amount,
            position_amount,
            position_value,
            total_base: math::add(base_amount, position_value)?,
        });
    }
    Ok(quotes)
}

/// Burn proposal shares and return their value to the pool as shares
pub fn reinvest(
    env: &Env,
    params: &PoolParams,
    holder: &Address,
    proposal_id: u32,
    amount: i128,
    min_base_out: i128,
) -> Result<i128, Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    let mut proposal = storage::get_risky_proposal(env, proposal_id)?;
    let scope = LedgerScope::Proposal(proposal_id);
    let supply = ledger::supply(env, &scope);
    let balance = ledger::balance(env, &scope, holder);
    if balance < amount {
        return Err(Error::InsufShares);
    }

    let base_part = math::mul_div(env, proposal.balance_base, amount, supply)?;
    let position_part = math::mul_div(env, proposal.balance_position, amount, supply)?;
    let received = pool::swap(env, &proposal.token, &params.base_token, position_part, min_base_out)?;
    let base_amount = math::add(base_part, received)?;

    let mut record = storage::get_proposal_holder(env, proposal_id, holder);
    let (lp_unlocked, principal) = pool::take_lock_share(env, &mut record, amount, balance)?;
    storage::set_proposal_holder(env, proposal_id, holder, &record);

    proposal.balance_base -= base_part;
    proposal.balance_position -= position_part;
    proposal.invested_base -= math::mul_div(env, proposal.invested_base, amount, supply)?;
    proposal.locked_lp -= lp_unlocked;
    storage::set_risky_proposal(env, proposal_id, &proposal);

    ledger::burn_proposal(env, proposal_id, holder, amount)?;
    track_supply(env, &proposal.token, supply, supply - amount)?;

    let minted = pool::unlock_to_shares(env, params, holder, base_amount, principal, lp_unlocked)?;

    env.events().publish(
        (PROPOSAL_REINVESTED,),
        (holder.clone(), proposal_id, amount, minted),
    );

    Ok(minted)
}

/// Reinvest the holder's whole balance of every proposal it holds
pub fn reinvest_all(
    env: &Env,
    params: &PoolParams,
    holder: &Address,
    min_base_outs: &Vec<i128>,
) -> Result<i128, Error> {
    let proposal_ids = storage::get_active_investments(env, holder);
    if proposal_ids.is_empty() {
        return Err(Error::NothingToReinvest);
    }
    if proposal_ids.len() != min_base_outs.len() {
        return Err(Error::LenMismatch);
    }

    let mut minted = 0;
    for (i, proposal_id) in proposal_ids.iter().enumerate() {
        let balance = ledger::balance(env, &LedgerScope::Proposal(proposal_id), holder);
        let out = reinvest(
            env,
            params,
            holder,
            proposal_id,
            balance,
            pool::nth(min_base_outs, i as u32)?,
        )?;
        minted = math::add(minted, out)?;
    }
    Ok(minted)
}

pub fn transfer(
    env: &Env,
    params: &PoolParams,
    from: &Address,
    to: &Address,
    proposal_id: u32,
    amount: i128,
) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    storage::get_risky_proposal(env, proposal_id)?;

    let scope = LedgerScope::Proposal(proposal_id);
    let from_balance = ledger::balance(env, &scope, from);
    if from_balance < amount {
        return Err(Error::InsufShares);
    }

    let mut trader_balance = ledger::balance(env, &scope, &params.trader);
    if *from == params.trader {
        trader_balance -= amount;
    }
    validation::check_exposure(
        params,
        to,
        math::add(ledger::balance(env, &scope, to), amount)?,
        trader_balance,
    )?;

    let mut from_record = storage::get_proposal_holder(env, proposal_id, from);
    let (locked_lp, principal) = pool::take_lock_share(env, &mut from_record, amount, from_balance)?;
    storage::set_proposal_holder(env, proposal_id, from, &from_record);
    add_lock(env, proposal_id, to, locked_lp, principal)?;

    ledger::transfer_proposal(env, proposal_id, from, to, amount)?;

    env.events().publish(
        (PROPOSAL_TRANSFER,),
        (from.clone(), to.clone(), proposal_id, amount),
    );
    Ok(())
}

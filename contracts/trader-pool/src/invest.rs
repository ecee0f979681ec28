//! Invest proposals: capital raised for the trader and repaid as dividends.
//!
//! Proposal shares are minted 1:1 against the base token raised. Repayments
//! and converted capital are spread over the shares through a per-share
//! accumulator scaled by `REWARD_SCALE`.

use shared::constants::REWARD_SCALE;
use shared::errors::Error;
use shared::events::{
    PROPOSAL_CLAIMED, PROPOSAL_CONVERTED, PROPOSAL_CREATED, PROPOSAL_INVESTED, PROPOSAL_REINVESTED,
    PROPOSAL_SUPPLIED, PROPOSAL_TRANSFER, PROPOSAL_WITHDRAWN,
};
use shared::math;
use shared::types::{InvestProposal, PoolKind, PoolParams, ProposalHolder, ProposalInvestQuote, ProposalLimits};
use soroban_sdk::{token::TokenClient, Address, Env, Vec};

use crate::ledger;
use crate::pool;
use crate::storage::{self, LedgerScope};
use crate::validation;

/// Holder record with dividends accrued up to the current accumulator
fn settle(env: &Env, proposal_id: u32, proposal: &InvestProposal, holder: &Address) -> Result<ProposalHolder, Error> {
    let mut record = storage::get_proposal_holder(env, proposal_id, holder);
    let balance = ledger::balance(env, &LedgerScope::Proposal(proposal_id), holder);
    let accrued = math::mul_div(env, balance, proposal.reward_per_share, REWARD_SCALE)?;
    record.pending_reward = math::add(record.pending_reward, accrued - record.reward_debt)?;
    record.reward_debt = accrued;
    Ok(record)
}

/// Re-anchor the reward checkpoint after a balance change
fn checkpoint(
    env: &Env,
    proposal_id: u32,
    proposal: &InvestProposal,
    holder: &Address,
    record: &mut ProposalHolder,
) -> Result<(), Error> {
    let balance = ledger::balance(env, &LedgerScope::Proposal(proposal_id), holder);
    record.reward_debt = math::mul_div(env, balance, proposal.reward_per_share, REWARD_SCALE)?;
    storage::set_proposal_holder(env, proposal_id, holder, record);
    Ok(())
}

/// Release the lock backing `repaid` base: principal is paid back first
///
/// Returns `(locked_lp, principal)` removed from the record.
fn release_principal(env: &Env, record: &mut ProposalHolder, repaid: i128) -> Result<(i128, i128), Error> {
    if record.invested_base == 0 {
        return Ok((0, 0));
    }
    let invested_base = record.invested_base;
    pool::take_lock_share(env, record, repaid.min(invested_base), invested_base)
}

fn spread(env: &Env, proposal: &mut InvestProposal, amount: i128, supply: i128) -> Result<(), Error> {
    let per_share = math::mul_div(env, amount, REWARD_SCALE, supply)?;
    proposal.reward_per_share = math::add(proposal.reward_per_share, per_share)?;
    Ok(())
}

pub fn create(
    env: &Env,
    params: &PoolParams,
    trader: &Address,
    lp_amount: i128,
    limits: ProposalLimits,
    min_divest_out: &Vec<i128>,
) -> Result<u32, Error> {
    validation::require_kind(params, PoolKind::Invest)?;

    let (base_amount, principal) = pool::lock_shares(env, params, trader, lp_amount, min_divest_out)?;
    if base_amount <= 0 {
        return Err(Error::ZeroValue);
    }

    let mut state = storage::get_state(env)?;
    let proposal_id = state.proposals_count + 1;
    state.proposals_count = proposal_id;
    if state.first_exchange == 0 {
        state.first_exchange = env.ledger().timestamp();
    }
    storage::set_state(env, &state);

    let proposal = InvestProposal {
        limits,
        balance_base: base_amount,
        invested_base: base_amount,
        new_invested_base: base_amount,
        locked_lp: lp_amount,
        reward_per_share: 0,
        converted: false,
    };
    storage::set_invest_proposal(env, proposal_id, &proposal);

    ledger::mint_proposal(env, proposal_id, trader, base_amount)?;
    storage::set_proposal_holder(
        env,
        proposal_id,
        trader,
        &ProposalHolder {
            locked_lp: lp_amount,
            invested_base: principal,
            reward_debt: 0,
            pending_reward: 0,
        },
    );

    env.events()
        .publish((PROPOSAL_CREATED,), (proposal_id, trader.clone(), base_amount));

    Ok(proposal_id)
}

pub fn quote_invest(
    env: &Env,
    params: &PoolParams,
    proposal_id: u32,
    lp_amount: i128,
) -> Result<ProposalInvestQuote, Error> {
    storage::get_invest_proposal(env, proposal_id)?;
    let (base_amount, pool_position_values) = pool::quote_lock(env, params, lp_amount)?;

    Ok(ProposalInvestQuote {
        base_amount,
        pool_position_values,
        proposal_shares: base_amount,
        base_kept: base_amount,
        position_given: 0,
        position_received: 0,
    })
}

pub fn invest(
    env: &Env,
    params: &PoolParams,
    investor: &Address,
    proposal_id: u32,
    lp_amount: i128,
    min_divest_out: &Vec<i128>,
) -> Result<i128, Error> {
    validation::require_kind(params, PoolKind::Invest)?;

    let mut proposal = storage::get_invest_proposal(env, proposal_id)?;
    if proposal.converted {
        return Err(Error::PropConverted);
    }
    validation::check_not_expired(env, &proposal.limits)?;

    let (base_amount, principal) = pool::lock_shares(env, params, investor, lp_amount, min_divest_out)?;
    validation::check_invested_cap(&proposal.limits, proposal.invested_base, base_amount)?;
    if base_amount <= 0 {
        return Err(Error::ZeroValue);
    }

    let mut record = settle(env, proposal_id, &proposal, investor)?;
    ledger::mint_proposal(env, proposal_id, investor, base_amount)?;
    record.locked_lp = math::add(record.locked_lp, lp_amount)?;
    record.invested_base = math::add(record.invested_base, principal)?;
    checkpoint(env, proposal_id, &proposal, investor, &mut record)?;

    proposal.balance_base = math::add(proposal.balance_base, base_amount)?;
    proposal.invested_base = math::add(proposal.invested_base, base_amount)?;
    proposal.new_invested_base = math::add(proposal.new_invested_base, base_amount)?;
    proposal.locked_lp = math::add(proposal.locked_lp, lp_amount)?;
    storage::set_invest_proposal(env, proposal_id, &proposal);

    env.events().publish(
        (PROPOSAL_INVESTED,),
        (investor.clone(), proposal_id, lp_amount, base_amount),
    );

    Ok(base_amount)
}

/// Lend raised capital out to the trader
pub fn withdraw(env: &Env, params: &PoolParams, proposal_id: u32, amount: i128) -> Result<(), Error> {
    validation::require_kind(params, PoolKind::Invest)?;
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }

    let mut proposal = storage::get_invest_proposal(env, proposal_id)?;
    if proposal.converted {
        return Err(Error::PropConverted);
    }
    if amount > proposal.new_invested_base {
        return Err(Error::InsufBalance);
    }

    proposal.new_invested_base -= amount;
    proposal.balance_base -= amount;
    storage::set_invest_proposal(env, proposal_id, &proposal);

    TokenClient::new(env, &params.base_token).transfer(
        &env.current_contract_address(),
        &params.trader,
        &amount,
    );

    env.events()
        .publish((PROPOSAL_WITHDRAWN,), (proposal_id, amount));
    Ok(())
}

/// Repay into a proposal, spreading `amount` over its shares
pub fn supply(env: &Env, params: &PoolParams, proposal_id: u32, amount: i128) -> Result<(), Error> {
    validation::require_kind(params, PoolKind::Invest)?;
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }

    let mut proposal = storage::get_invest_proposal(env, proposal_id)?;
    let supply = ledger::supply(env, &LedgerScope::Proposal(proposal_id));
    if supply == 0 {
        return Err(Error::EmptyProposal);
    }

    TokenClient::new(env, &params.base_token).transfer(
        &params.trader,
        &env.current_contract_address(),
        &amount,
    );

    spread(env, &mut proposal, amount, supply)?;
    proposal.balance_base = math::add(proposal.balance_base, amount)?;
    storage::set_invest_proposal(env, proposal_id, &proposal);

    env.events()
        .publish((PROPOSAL_SUPPLIED,), (proposal_id, amount));
    Ok(())
}

/// Turn the unwithdrawn raised capital into dividends
pub fn convert_to_dividends(env: &Env, params: &PoolParams, proposal_id: u32) -> Result<i128, Error> {
    validation::require_kind(params, PoolKind::Invest)?;

    let mut proposal = storage::get_invest_proposal(env, proposal_id)?;
    if proposal.converted {
        return Err(Error::PropConverted);
    }
    let amount = proposal.new_invested_base;
    if amount == 0 {
        return Err(Error::NothingToConvert);
    }
    let supply = ledger::supply(env, &LedgerScope::Proposal(proposal_id));
    if supply == 0 {
        return Err(Error::EmptyProposal);
    }

    spread(env, &mut proposal, amount, supply)?;
    proposal.new_invested_base = 0;
    proposal.converted = true;
    storage::set_invest_proposal(env, proposal_id, &proposal);

    env.events()
        .publish((PROPOSAL_CONVERTED,), (proposal_id, amount));
    Ok(amount)
}

pub fn pending_dividends(env: &Env, proposal_id: u32, holder: &Address) -> Result<i128, Error> {
    let proposal = storage::get_invest_proposal(env, proposal_id)?;
    Ok(settle(env, proposal_id, &proposal, holder)?.pending_reward)
}

/// Pay the holder's dividends out in base token
pub fn claim(env: &Env, params: &PoolParams, holder: &Address, proposal_id: u32) -> Result<i128, Error> {
    validation::require_kind(params, PoolKind::Invest)?;

    let mut proposal = storage::get_invest_proposal(env, proposal_id)?;
    let mut record = settle(env, proposal_id, &proposal, holder)?;
    let paid = record.pending_reward;
    if paid == 0 {
        return Err(Error::NothingToClaim);
    }

    record.pending_reward = 0;
    let (lp_released, _) = release_principal(env, &mut record, paid)?;
    storage::set_proposal_holder(env, proposal_id, holder, &record);

    proposal.balance_base -= paid;
    proposal.locked_lp -= lp_released;
    storage::set_invest_proposal(env, proposal_id, &proposal);

    let mut state = storage::get_state(env)?;
    state.total_locked_lp = math::sub(state.total_locked_lp, lp_released)?;
    storage::set_state(env, &state);

    TokenClient::new(env, &params.base_token).transfer(
        &env.current_contract_address(),
        holder,
        &paid,
    );

    env.events()
        .publish((PROPOSAL_CLAIMED,), (holder.clone(), proposal_id, paid));
    Ok(paid)
}

pub fn claim_all(env: &Env, params: &PoolParams, holder: &Address) -> Result<i128, Error> {
    validation::require_kind(params, PoolKind::Invest)?;

    let mut total = 0;
    for proposal_id in storage::get_active_investments(env, holder).iter() {
        if pending_dividends(env, proposal_id, holder)? > 0 {
            total = math::add(total, claim(env, params, holder, proposal_id)?)?;
        }
    }
    if total == 0 {
        return Err(Error::NothingToClaim);
    }
    Ok(total)
}

/// Mint pool shares from the holder's dividends, keeping its proposal shares
pub fn reinvest(env: &Env, params: &PoolParams, holder: &Address, proposal_id: u32) -> Result<i128, Error> {
    validation::require_kind(params, PoolKind::Invest)?;

    let mut proposal = storage::get_invest_proposal(env, proposal_id)?;
    let mut record = settle(env, proposal_id, &proposal, holder)?;
    let dividends = record.pending_reward;
    if dividends == 0 {
        return Err(Error::NothingToReinvest);
    }

    record.pending_reward = 0;
    let (lp_unlocked, principal) = release_principal(env, &mut record, dividends)?;
    storage::set_proposal_holder(env, proposal_id, holder, &record);

    proposal.balance_base -= dividends;
    proposal.locked_lp -= lp_unlocked;
    storage::set_invest_proposal(env, proposal_id, &proposal);

    let minted = pool::unlock_to_shares(env, params, holder, dividends, principal, lp_unlocked)?;

    env.events().publish(
        (PROPOSAL_REINVESTED,),
        (holder.clone(), proposal_id, dividends, minted),
    );
    Ok(minted)
}

pub fn reinvest_all(env: &Env, params: &PoolParams, holder: &Address) -> Result<i128, Error> {
    validation::require_kind(params, PoolKind::Invest)?;

    let mut minted = 0;
    let mut reinvested = false;
    for proposal_id in storage::get_active_investments(env, holder).iter() {
        if pending_dividends(env, proposal_id, holder)? > 0 {
            minted = math::add(minted, reinvest(env, params, holder, proposal_id)?)?;
            reinvested = true;
        }
    }
    if !reinvested {
        return Err(Error::NothingToReinvest);
    }
    Ok(minted)
}

pub fn transfer(
    env: &Env,
    from: &Address,
    to: &Address,
    proposal_id: u32,
    amount: i128,
) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    let proposal = storage::get_invest_proposal(env, proposal_id)?;
    let from_balance = ledger::balance(env, &LedgerScope::Proposal(proposal_id), from);
    if from_balance < amount {
        return Err(Error::InsufShares);
    }

    let mut from_record = settle(env, proposal_id, &proposal, from)?;
    let mut to_record = settle(env, proposal_id, &proposal, to)?;
    let (locked_lp, principal) = pool::take_lock_share(env, &mut from_record, amount, from_balance)?;
    to_record.locked_lp = math::add(to_record.locked_lp, locked_lp)?;
    to_record.invested_base = math::add(to_record.invested_base, principal)?;

    ledger::transfer_proposal(env, proposal_id, from, to, amount)?;

    checkpoint(env, proposal_id, &proposal, from, &mut from_record)?;
    checkpoint(env, proposal_id, &proposal, to, &mut to_record)?;

    env.events().publish(
        (PROPOSAL_TRANSFER,),
        (from.clone(), to.clone(), proposal_id, amount),
    );
    Ok(())
}

//! Fungible share ledger shared by the pool and its proposals.
//!
//! Every scope keeps `sum(balances) == supply`. Mutations report whether a
//! holder's balance crossed zero so callers can keep their secondary indexes
//! (investor registry, active-investment index) in step.

use shared::errors::Error;
use shared::math;
use soroban_sdk::{Address, Env};
use soroban_token_sdk::TokenUtils;

use crate::storage::{self, LedgerScope};

/// Zero-crossings caused by a ledger mutation
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Transition {
    /// Receiver went from zero to a positive balance
    pub opened: bool,
    /// Sender went from a positive balance to zero
    pub closed: bool,
}

pub fn balance(env: &Env, scope: &LedgerScope, holder: &Address) -> i128 {
    storage::get_balance(env, scope, holder)
}

pub fn supply(env: &Env, scope: &LedgerScope) -> i128 {
    storage::get_supply(env, scope)
}

pub fn mint(env: &Env, scope: &LedgerScope, to: &Address, amount: i128) -> Result<Transition, Error> {
    if amount < 0 {
        return Err(Error::InvInput);
    }
    if amount == 0 {
        return Ok(Transition::default());
    }

    let before = balance(env, scope, to);
    storage::set_balance(env, scope, to, math::add(before, amount)?);
    storage::set_supply(env, scope, math::add(supply(env, scope), amount)?);

    if *scope == LedgerScope::Pool {
        TokenUtils::new(env)
            .events()
            .mint(env.current_contract_address(), to.clone(), amount);
    }

    Ok(Transition {
        opened: before == 0,
        closed: false,
    })
}

pub fn burn(env: &Env, scope: &LedgerScope, from: &Address, amount: i128) -> Result<Transition, Error> {
    if amount < 0 {
        return Err(Error::InvInput);
    }
    if amount == 0 {
        return Ok(Transition::default());
    }

    let before = balance(env, scope, from);
    if before < amount {
        return Err(Error::InsufShares);
    }
    let after = before - amount;
    storage::set_balance(env, scope, from, after);
    storage::set_supply(env, scope, math::sub(supply(env, scope), amount)?);

    if *scope == LedgerScope::Pool {
        TokenUtils::new(env).events().burn(from.clone(), amount);
    }

    Ok(Transition {
        opened: false,
        closed: after == 0,
    })
}

pub fn transfer(
    env: &Env,
    scope: &LedgerScope,
    from: &Address,
    to: &Address,
    amount: i128,
) -> Result<Transition, Error> {
    if amount <= 0 {
        return Err(Error::ZeroAmount);
    }
    if from == to {
        return Err(Error::InvInput);
    }

    let from_before = balance(env, scope, from);
    if from_before < amount {
        return Err(Error::InsufShares);
    }
    let to_before = balance(env, scope, to);

    storage::set_balance(env, scope, from, from_before - amount);
    storage::set_balance(env, scope, to, math::add(to_before, amount)?);

    if *scope == LedgerScope::Pool {
        TokenUtils::new(env)
            .events()
            .transfer(from.clone(), to.clone(), amount);
    }

    Ok(Transition {
        opened: to_before == 0,
        closed: from_before == amount,
    })
}

/// Mint proposal shares, indexing the proposal for a new holder
pub fn mint_proposal(env: &Env, proposal_id: u32, to: &Address, amount: i128) -> Result<Transition, Error> {
    let transition = mint(env, &LedgerScope::Proposal(proposal_id), to, amount)?;
    if transition.opened {
        index_active(env, to, proposal_id);
    }
    Ok(transition)
}

/// Burn proposal shares, dropping the proposal from the holder's index at zero
pub fn burn_proposal(env: &Env, proposal_id: u32, from: &Address, amount: i128) -> Result<Transition, Error> {
    let transition = burn(env, &LedgerScope::Proposal(proposal_id), from, amount)?;
    if transition.closed {
        unindex_active(env, from, proposal_id);
    }
    Ok(transition)
}

pub fn transfer_proposal(
    env: &Env,
    proposal_id: u32,
    from: &Address,
    to: &Address,
    amount: i128,
) -> Result<Transition, Error> {
    let transition = transfer(env, &LedgerScope::Proposal(proposal_id), from, to, amount)?;
    if transition.closed {
        unindex_active(env, from, proposal_id);
    }
    if transition.opened {
        index_active(env, to, proposal_id);
    }
    Ok(transition)
}

fn index_active(env: &Env, holder: &Address, proposal_id: u32) {
    let mut ids = storage::get_active_investments(env, holder);
    if !ids.contains(proposal_id) {
        ids.push_back(proposal_id);
        storage::set_active_investments(env, holder, &ids);
    }
}

fn unindex_active(env: &Env, holder: &Address, proposal_id: u32) {
    let mut ids = storage::get_active_investments(env, holder);
    if let Some(index) = ids.first_index_of(proposal_id) {
        ids.remove(index);
        storage::set_active_investments(env, holder, &ids);
    }
}

use shared::errors::Error;
use shared::types::{
    InvestProposal, InvestorInfo, PoolParams, PoolState, ProposalHolder, RiskyProposal,
};
use soroban_sdk::{contracttype, Address, Env, Vec};

/// Owner scope of a share ledger
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LedgerScope {
    /// Base pool LP shares
    Pool,
    /// Shares of one proposal
    Proposal(u32),
}

/// Storage keys of the trader pool contract
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Params,
    State,
    PriceFeed,
    CoreProperties,
    /// Ordered list of open position tokens
    Positions,
    PositionBalance(Address),
    PrivateInvestor(Address),
    Balance(LedgerScope, Address),
    Supply(LedgerScope),
    Investor(Address),
    InvestorsCount,
    /// Registry slot -> holder
    InvestorAt(u32),
    /// Holder -> registry slot + 1
    InvestorSlot(Address),
    RiskyProposal(u32),
    InvestProposal(u32),
    ProposalHolder(u32, Address),
    ActiveInvestments(Address),
}

// ==================== Pool configuration ====================

/// Check if the pool has been initialized
pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Params)
}

/// Store pool parameters
pub fn set_params(env: &Env, params: &PoolParams) {
    env.storage().instance().set(&DataKey::Params, params);
}

/// Retrieve pool parameters
pub fn get_params(env: &Env) -> Result<PoolParams, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Params)
        .ok_or(Error::NotInit)
}

/// Store pool-wide accounting
pub fn set_state(env: &Env, state: &PoolState) {
    env.storage().instance().set(&DataKey::State, state);
}

/// Retrieve pool-wide accounting
pub fn get_state(env: &Env) -> Result<PoolState, Error> {
    env.storage()
        .instance()
        .get(&DataKey::State)
        .ok_or(Error::NotInit)
}

pub fn set_price_feed(env: &Env, price_feed: &Address) {
    env.storage().instance().set(&DataKey::PriceFeed, price_feed);
}

pub fn get_price_feed(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::PriceFeed)
        .ok_or(Error::NotInit)
}

pub fn set_core_properties(env: &Env, core_properties: &Address) {
    env.storage()
        .instance()
        .set(&DataKey::CoreProperties, core_properties);
}

pub fn get_core_properties(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::CoreProperties)
        .ok_or(Error::NotInit)
}

// ==================== Positions ====================

/// Retrieve open position tokens in opening order
pub fn get_positions(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&DataKey::Positions)
        .unwrap_or(Vec::new(env))
}

pub fn set_positions(env: &Env, positions: &Vec<Address>) {
    env.storage().instance().set(&DataKey::Positions, positions);
}

/// Retrieve the pool's internal balance of a position token
pub fn get_position_balance(env: &Env, token: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::PositionBalance(token.clone()))
        .unwrap_or(0)
}

/// Store a position balance, dropping the entry at zero
pub fn set_position_balance(env: &Env, token: &Address, amount: i128) {
    let key = DataKey::PositionBalance(token.clone());
    if amount == 0 {
        env.storage().persistent().remove(&key);
    } else {
        env.storage().persistent().set(&key, &amount);
    }
}

// ==================== Private pool allow-list ====================

pub fn is_private_investor(env: &Env, investor: &Address) -> bool {
    env.storage()
        .persistent()
        .get(&DataKey::PrivateInvestor(investor.clone()))
        .unwrap_or(false)
}

pub fn set_private_investor(env: &Env, investor: &Address, allowed: bool) {
    let key = DataKey::PrivateInvestor(investor.clone());
    if allowed {
        env.storage().persistent().set(&key, &true);
    } else {
        env.storage().persistent().remove(&key);
    }
}

// ==================== Share ledgers ====================

pub fn get_balance(env: &Env, scope: &LedgerScope, holder: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Balance(scope.clone(), holder.clone()))
        .unwrap_or(0)
}

pub fn set_balance(env: &Env, scope: &LedgerScope, holder: &Address, amount: i128) {
    let key = DataKey::Balance(scope.clone(), holder.clone());
    if amount == 0 {
        env.storage().persistent().remove(&key);
    } else {
        env.storage().persistent().set(&key, &amount);
    }
}

pub fn get_supply(env: &Env, scope: &LedgerScope) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Supply(scope.clone()))
        .unwrap_or(0)
}

pub fn set_supply(env: &Env, scope: &LedgerScope, amount: i128) {
    env.storage()
        .persistent()
        .set(&DataKey::Supply(scope.clone()), &amount);
}

// ==================== Investors ====================

/// Retrieve commission bookkeeping of a holder, empty if unknown
pub fn get_investor(env: &Env, holder: &Address) -> InvestorInfo {
    env.storage()
        .persistent()
        .get(&DataKey::Investor(holder.clone()))
        .unwrap_or_default()
}

pub fn set_investor(env: &Env, holder: &Address, info: &InvestorInfo) {
    let key = DataKey::Investor(holder.clone());
    if *info == InvestorInfo::default() {
        env.storage().persistent().remove(&key);
    } else {
        env.storage().persistent().set(&key, info);
    }
}

pub fn get_investors_count(env: &Env) -> u32 {
    env.storage()
        .persistent()
        .get(&DataKey::InvestorsCount)
        .unwrap_or(0)
}

pub fn is_registered_investor(env: &Env, holder: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::InvestorSlot(holder.clone()))
}

/// Retrieve the holder at a registry slot
pub fn get_investor_at(env: &Env, index: u32) -> Result<Address, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::InvestorAt(index))
        .ok_or(Error::OutOfRange)
}

/// Append a holder to the registry, no-op if already present
pub fn add_investor(env: &Env, holder: &Address) {
    if is_registered_investor(env, holder) {
        return;
    }
    let count = get_investors_count(env);
    let storage = env.storage().persistent();
    storage.set(&DataKey::InvestorAt(count), holder);
    storage.set(&DataKey::InvestorSlot(holder.clone()), &(count + 1));
    storage.set(&DataKey::InvestorsCount, &(count + 1));
}

/// Remove a holder from the registry, moving the last holder into its slot
pub fn remove_investor(env: &Env, holder: &Address) {
    let storage = env.storage().persistent();
    let slot: u32 = match storage.get(&DataKey::InvestorSlot(holder.clone())) {
        Some(slot) => slot,
        None => return,
    };
    let index = slot - 1;
    let last_index = get_investors_count(env) - 1;

    if index != last_index {
        if let Some(last) = storage.get::<DataKey, Address>(&DataKey::InvestorAt(last_index)) {
            storage.set(&DataKey::InvestorAt(index), &last);
            storage.set(&DataKey::InvestorSlot(last), &slot);
        }
    }

    storage.remove(&DataKey::InvestorAt(last_index));
    storage.remove(&DataKey::InvestorSlot(holder.clone()));
    storage.set(&DataKey::InvestorsCount, &last_index);
}

// ==================== Proposals ====================

pub fn get_risky_proposal(env: &Env, proposal_id: u32) -> Result<RiskyProposal, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::RiskyProposal(proposal_id))
        .ok_or(Error::NotFound)
}

pub fn set_risky_proposal(env: &Env, proposal_id: u32, proposal: &RiskyProposal) {
    env.storage()
        .persistent()
        .set(&DataKey::RiskyProposal(proposal_id), proposal);
}

pub fn get_invest_proposal(env: &Env, proposal_id: u32) -> Result<InvestProposal, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::InvestProposal(proposal_id))
        .ok_or(Error::NotFound)
}

pub fn set_invest_proposal(env: &Env, proposal_id: u32, proposal: &InvestProposal) {
    env.storage()
        .persistent()
        .set(&DataKey::InvestProposal(proposal_id), proposal);
}

/// Retrieve a holder's lock record in a proposal, empty if unknown
pub fn get_proposal_holder(env: &Env, proposal_id: u32, holder: &Address) -> ProposalHolder {
    env.storage()
        .persistent()
        .get(&DataKey::ProposalHolder(proposal_id, holder.clone()))
        .unwrap_or_default()
}

pub fn set_proposal_holder(env: &Env, proposal_id: u32, holder: &Address, record: &ProposalHolder) {
    env.storage()
        .persistent()
        .set(&DataKey::ProposalHolder(proposal_id, holder.clone()), record);
}

/// Retrieve ids of proposals the holder has a balance in
pub fn get_active_investments(env: &Env, holder: &Address) -> Vec<u32> {
    env.storage()
        .persistent()
        .get(&DataKey::ActiveInvestments(holder.clone()))
        .unwrap_or(Vec::new(env))
}

pub fn set_active_investments(env: &Env, holder: &Address, ids: &Vec<u32>) {
    let key = DataKey::ActiveInvestments(holder.clone());
    if ids.is_empty() {
        env.storage().persistent().remove(&key);
    } else {
        env.storage().persistent().set(&key, ids);
    }
}

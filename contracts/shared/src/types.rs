use soroban_sdk::{contracttype, Address, Vec};

use crate::errors::Error;
use crate::math;

pub type Amount = i128;

/// Flavour of a pool, which decides the proposal model it hosts
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum PoolKind {
    /// Actively traded pool with risky proposals
    Basic = 0,
    /// Financing pool with invest proposals
    Invest = 1,
}

/// Commission period of a pool (1, 3 or 12 months)
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum CommissionPeriod {
    Period1 = 0,
    Period2 = 1,
    Period3 = 2,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ExchangeType {
    /// `amount` is spent exactly, `amount_bound` is the minimum received
    FromExact = 0,
    /// `amount` is received exactly, `amount_bound` is the maximum spent
    ToExact = 1,
}

/// Pool parameters fixed at creation (a few are editable by the trader)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolParams {
    pub trader: Address,
    pub base_token: Address,
    pub base_decimals: u32,
    pub kind: PoolKind,
    pub private_pool: bool,
    /// Cap on total share supply, 0 = unbounded
    pub total_lp_emission: Amount,
    pub minimal_investment: Amount,
    pub commission_period: CommissionPeriod,
    /// Trader's nominal cut, `PERCENTAGE_100` = 100%
    pub commission_percentage: i128,
}

/// Mutable pool-wide accounting
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolState {
    pub base_balance: Amount,
    pub total_locked_lp: Amount,
    pub proposals_count: u32,
    pub first_exchange: u64,
    /// Token of the risky proposals that still have holders
    pub risky_token: Option<Address>,
    pub live_risky_proposals: u32,
}

/// Per-holder commission bookkeeping
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InvestorInfo {
    /// Principal still attributable to the held shares
    pub invested_base: Amount,
    /// Epoch index at or after which commission may be collected
    pub commission_unlock_epoch: u64,
    /// Share value right after the last commission collection
    pub high_water_mark: Amount,
}

/// Configuration served by the core properties contract
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoreConfig {
    pub max_pool_investors: u32,
    pub max_open_positions: u32,
    pub leverage_threshold: Amount,
    pub leverage_slope: i128,
    /// Seconds per epoch, indexed by `CommissionPeriod`
    pub commission_durations: Vec<u64>,
    pub min_trader_commission: i128,
    /// Cap per `CommissionPeriod`
    pub max_trader_commissions: Vec<i128>,
    pub dexe_commission_percentage: i128,
    /// Treasury, dividends and insurance shares of the protocol commission
    pub dexe_commission_distribution: Vec<i128>,
    pub treasury: Address,
    pub dividends: Address,
    pub insurance: Address,
    pub delay_for_risky_pool: u64,
}

/// Snapshot of the pool's holdings valued in base token
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Valuation {
    pub total_value: Amount,
    pub base_balance: Amount,
    pub positions: Vec<Address>,
    pub position_balances: Vec<Amount>,
    pub position_values: Vec<Amount>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvestQuote {
    pub lp_amount: Amount,
    pub base_kept: Amount,
    pub positions: Vec<Address>,
    pub given_amounts: Vec<Amount>,
    pub received_amounts: Vec<Amount>,
}

/// Commission charged on one holder or a batch of holders
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommissionCharge {
    pub base_commission: Amount,
    pub trader_shares: Amount,
    pub treasury_shares: Amount,
    pub dividends_shares: Amount,
    pub insurance_shares: Amount,
}

impl CommissionCharge {
    pub fn total_shares(&self) -> Result<Amount, Error> {
        let protocol = math::add(self.treasury_shares, self.dividends_shares)?;
        math::add(math::add(self.trader_shares, protocol)?, self.insurance_shares)
    }

    /// Fold another holder's charge into a batch total
    pub fn absorb(&mut self, other: &CommissionCharge) -> Result<(), Error> {
        self.base_commission = math::add(self.base_commission, other.base_commission)?;
        self.trader_shares = math::add(self.trader_shares, other.trader_shares)?;
        self.treasury_shares = math::add(self.treasury_shares, other.treasury_shares)?;
        self.dividends_shares = math::add(self.dividends_shares, other.dividends_shares)?;
        self.insurance_shares = math::add(self.insurance_shares, other.insurance_shares)?;
        Ok(())
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DivestQuote {
    pub base_amount: Amount,
    pub positions: Vec<Address>,
    pub position_amounts: Vec<Amount>,
    /// Base token the position slices would fetch if liquidated
    pub position_values: Vec<Amount>,
    pub commission: CommissionCharge,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvestorView {
    pub info: InvestorInfo,
    pub balance: Amount,
    pub value: Amount,
    pub commission_due: CommissionCharge,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolInfo {
    pub params: PoolParams,
    pub state: PoolState,
    pub total_supply: Amount,
    pub investors_count: u32,
    pub valuation: Valuation,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeverageInfo {
    pub positions_value: Amount,
    pub max_leverage: Amount,
}

/// Entry limits of a proposal, each field 0 = unbounded
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalLimits {
    pub timestamp_limit: u64,
    pub max_invested_base: Amount,
    /// Ignored by invest proposals
    pub max_token_price: Amount,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RiskyProposal {
    pub token: Address,
    pub limits: ProposalLimits,
    pub balance_base: Amount,
    pub balance_position: Amount,
    pub invested_base: Amount,
    pub locked_lp: Amount,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvestProposal {
    pub limits: ProposalLimits,
    pub balance_base: Amount,
    pub invested_base: Amount,
    /// Raised base still available for withdrawal by the trader
    pub new_invested_base: Amount,
    pub locked_lp: Amount,
    /// Dividends per proposal share, scaled by `REWARD_SCALE`
    pub reward_per_share: i128,
    pub converted: bool,
}

/// Lock record of one holder in one proposal
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProposalHolder {
    pub locked_lp: Amount,
    pub invested_base: Amount,
    pub reward_debt: i128,
    pub pending_reward: Amount,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalInvestQuote {
    /// Base released by the pool for the locked shares
    pub base_amount: Amount,
    /// Expected base fetched by liquidating each pool position slice
    pub pool_position_values: Vec<Amount>,
    pub proposal_shares: Amount,
    pub base_kept: Amount,
    pub position_given: Amount,
    pub position_received: Amount,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalDivestQuote {
    pub proposal_id: u32,
    pub base_amount: Amount,
    pub position_amount: Amount,
    /// Base the position slice fetches once liquidated
    pub position_value: Amount,
    pub total_base: Amount,
}

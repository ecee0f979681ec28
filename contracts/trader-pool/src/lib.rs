#![no_std]

use shared::{
    errors::Error,
    events::{PARAMS_CHANGED, POOL_INITIALIZED, PRIVATE_INVESTORS},
    math,
    types::{
        Amount, CommissionCharge, DivestQuote, ExchangeType, InvestProposal, InvestQuote,
        InvestorView, LeverageInfo, PoolInfo, PoolKind, PoolParams, PoolState, ProposalDivestQuote,
        ProposalHolder, ProposalInvestQuote, ProposalLimits, RiskyProposal, Valuation,
    },
};
use soroban_sdk::{contract, contractimpl, Address, Env, String, Vec};
use soroban_token_sdk::{metadata::TokenMetadata, TokenUtils};

mod commission;
mod invest;
mod ledger;
mod pool;
mod risky;
mod storage;
mod validation;

#[cfg(test)]
mod tests;

use storage::LedgerScope;

#[contract]
pub struct TraderPool;

#[contractimpl]
impl TraderPool {
    /// Initialize the pool
    ///
    /// # Arguments
    /// * `params` - Pool parameters, `params.trader` must authorize
    /// * `name` - Name of the pool share token
    /// * `symbol` - Symbol of the pool share token
    /// * `price_feed` - Exchange router used for quotes and swaps
    /// * `core_properties` - Global configuration contract
    pub fn initialize(
        env: Env,
        params: PoolParams,
        name: String,
        symbol: String,
        price_feed: Address,
        core_properties: Address,
    ) -> Result<(), Error> {
        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInit);
        }
        params.trader.require_auth();

        storage::set_price_feed(&env, &price_feed);
        storage::set_core_properties(&env, &core_properties);
        let config = pool::load_config(&env)?;
        validation::validate_pool_params(&params, &config)?;

        TokenUtils::new(&env).metadata().set_metadata(&TokenMetadata {
            decimal: params.base_decimals,
            name,
            symbol,
        });

        storage::set_params(&env, &params);
        storage::set_state(
            &env,
            &PoolState {
                base_balance: 0,
                total_locked_lp: 0,
                proposals_count: 0,
                first_exchange: 0,
                risky_token: None,
                live_risky_proposals: 0,
            },
        );

        env.events().publish(
            (POOL_INITIALIZED,),
            (params.trader, params.base_token, params.kind),
        );

        Ok(())
    }

    // ==================== Base pool ====================

    /// Invest base token into the pool
    ///
    /// # Arguments
    /// * `investor` - Address of the investor
    /// * `amount` - Base token amount to invest
    /// * `min_positions_out` - Minimum received per open position, in position order
    ///
    /// Returns the pool shares minted.
    pub fn invest(
        env: Env,
        investor: Address,
        amount: Amount,
        min_positions_out: Vec<Amount>,
    ) -> Result<Amount, Error> {
        investor.require_auth();
        pool::invest(&env, &investor, amount, &min_positions_out)
    }

    /// Quote an investment of `amount` base token
    pub fn get_invest_tokens(env: Env, amount: Amount) -> Result<InvestQuote, Error> {
        let params = storage::get_params(&env)?;
        pool::quote_invest(&env, &params, amount)
    }

    /// Redeem pool shares
    ///
    /// # Arguments
    /// * `investor` - Address of the share holder
    /// * `lp_amount` - Shares to burn
    /// * `min_positions_out` - Minimum base received per liquidated position
    /// * `liquidate` - Sell position slices for base token instead of delivering them
    ///
    /// Returns the base token paid out.
    pub fn divest(
        env: Env,
        investor: Address,
        lp_amount: Amount,
        min_positions_out: Vec<Amount>,
        liquidate: bool,
    ) -> Result<Amount, Error> {
        investor.require_auth();
        pool::divest(&env, &investor, lp_amount, &min_positions_out, liquidate)
    }

    /// Quote a divest, including the commission taken beforehand
    pub fn get_divest_amounts(env: Env, investor: Address, lp_amount: Amount) -> Result<DivestQuote, Error> {
        pool::quote_divest(&env, &investor, lp_amount)
    }

    /// Trade pool holdings
    ///
    /// # Arguments
    /// * `trader` - The pool's trader
    /// * `from` - Token sold, base or an open position
    /// * `to` - Token bought
    /// * `amount` - Exact input for `FromExact`, exact output for `ToExact`
    /// * `amount_bound` - Minimum output for `FromExact`, maximum input for `ToExact`
    /// * `exchange_type` - Which side of the trade is exact
    ///
    /// Returns `(spent, received)`.
    pub fn exchange(
        env: Env,
        trader: Address,
        from: Address,
        to: Address,
        amount: Amount,
        amount_bound: Amount,
        exchange_type: ExchangeType,
    ) -> Result<(Amount, Amount), Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        pool::exchange(&env, &from, &to, amount, amount_bound, exchange_type)
    }

    pub fn get_exchange_from_exact_amount(
        env: Env,
        from: Address,
        to: Address,
        amount_in: Amount,
    ) -> Result<Amount, Error> {
        pool::quote_exchange(&env, &from, &to, amount_in, ExchangeType::FromExact)
    }

    pub fn get_exchange_to_exact_amount(
        env: Env,
        from: Address,
        to: Address,
        amount_out: Amount,
    ) -> Result<Amount, Error> {
        pool::quote_exchange(&env, &from, &to, amount_out, ExchangeType::ToExact)
    }

    /// Collect commission from due investors in registry slots `[offset, offset + limit)`
    pub fn reinvest_commission(
        env: Env,
        trader: Address,
        offset: u32,
        limit: u32,
    ) -> Result<CommissionCharge, Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        commission::reinvest(&env, offset, limit)
    }

    pub fn get_reinvest_commissions(env: Env, offset: u32, limit: u32) -> Result<CommissionCharge, Error> {
        commission::quote_reinvest(&env, offset, limit)
    }

    /// Transfer pool shares together with their principal
    pub fn transfer(env: Env, from: Address, to: Address, amount: Amount) -> Result<(), Error> {
        from.require_auth();
        pool::transfer(&env, &from, &to, amount)
    }

    pub fn balance(env: Env, id: Address) -> Amount {
        ledger::balance(&env, &LedgerScope::Pool, &id)
    }

    pub fn total_supply(env: Env) -> Amount {
        ledger::supply(&env, &LedgerScope::Pool)
    }

    pub fn decimals(env: Env) -> u32 {
        TokenUtils::new(&env).metadata().get_metadata().decimal
    }

    pub fn name(env: Env) -> String {
        TokenUtils::new(&env).metadata().get_metadata().name
    }

    pub fn symbol(env: Env) -> String {
        TokenUtils::new(&env).metadata().get_metadata().symbol
    }

    // ==================== Pool administration ====================

    /// Add or remove addresses from the private pool allow-list
    pub fn modify_private_investors(
        env: Env,
        trader: Address,
        investors: Vec<Address>,
        add: bool,
    ) -> Result<(), Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;

        for investor in investors.iter() {
            if !add && ledger::balance(&env, &LedgerScope::Pool, &investor) > 0 {
                return Err(Error::InvestorHasShares);
            }
            storage::set_private_investor(&env, &investor, add);
        }

        env.events()
            .publish((PRIVATE_INVESTORS,), (investors, add));
        Ok(())
    }

    /// Update the editable pool parameters
    pub fn change_pool_parameters(
        env: Env,
        trader: Address,
        private_pool: bool,
        total_lp_emission: Amount,
        minimal_investment: Amount,
    ) -> Result<(), Error> {
        trader.require_auth();
        let mut params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;

        if total_lp_emission < 0 || minimal_investment < 0 {
            return Err(Error::InvParams);
        }
        if total_lp_emission != 0 && total_lp_emission < ledger::supply(&env, &LedgerScope::Pool) {
            return Err(Error::EmissionLim);
        }

        params.private_pool = private_pool;
        params.total_lp_emission = total_lp_emission;
        params.minimal_investment = minimal_investment;
        storage::set_params(&env, &params);

        env.events().publish(
            (PARAMS_CHANGED,),
            (private_pool, total_lp_emission, minimal_investment),
        );
        Ok(())
    }

    // ==================== Pool views ====================

    pub fn get_pool_info(env: Env) -> Result<PoolInfo, Error> {
        let params = storage::get_params(&env)?;
        let valuation = pool::valuation(&env, &params)?;
        Ok(PoolInfo {
            params,
            state: storage::get_state(&env)?,
            total_supply: ledger::supply(&env, &LedgerScope::Pool),
            investors_count: storage::get_investors_count(&env),
            valuation,
        })
    }

    pub fn get_valuation(env: Env) -> Result<Valuation, Error> {
        let params = storage::get_params(&env)?;
        pool::valuation(&env, &params)
    }

    pub fn get_open_positions(env: Env) -> Vec<Address> {
        storage::get_positions(&env)
    }

    /// Holder bookkeeping, current share value and the commission currently due
    pub fn get_investor_info(env: Env, holder: Address) -> Result<InvestorView, Error> {
        let params = storage::get_params(&env)?;
        let config = pool::load_config(&env)?;
        let total_value = pool::valuation(&env, &params)?.total_value;
        let supply = ledger::supply(&env, &LedgerScope::Pool);
        let balance = ledger::balance(&env, &LedgerScope::Pool, &holder);

        let value = if supply > 0 {
            math::mul_div(&env, balance, total_value, supply)?
        } else {
            0
        };
        let commission_due = if commission::is_due(&env, &params, &config, &holder)? {
            commission::assess(&env, &params, &config, &holder, total_value, supply)?
        } else {
            CommissionCharge::default()
        };

        Ok(InvestorView {
            info: storage::get_investor(&env, &holder),
            balance,
            value,
            commission_due,
        })
    }

    /// Registered investors in slots `[offset, offset + limit)`
    pub fn get_investors(env: Env, offset: u32, limit: u32) -> Result<Vec<Address>, Error> {
        let count = storage::get_investors_count(&env);
        let end = offset.saturating_add(limit).min(count);

        let mut investors = Vec::new(&env);
        for index in offset..end {
            investors.push_back(storage::get_investor_at(&env, index)?);
        }
        Ok(investors)
    }

    /// Open-position value and the pool's leverage allowance (0 when disabled)
    pub fn get_leverage_info(env: Env) -> Result<LeverageInfo, Error> {
        let params = storage::get_params(&env)?;
        let config = pool::load_config(&env)?;
        pool::leverage_info(&env, &params, &config)
    }

    // ==================== Risky proposals ====================

    /// Create a risky proposal from the trader's pool shares
    ///
    /// # Arguments
    /// * `trader` - The pool's trader
    /// * `token` - Position token of the proposal
    /// * `lp_amount` - Pool shares locked into the proposal
    /// * `limits` - Entry limits of the proposal
    /// * `instant_trade_percentage` - Part of the locked base bought into `token` right away
    /// * `min_divest_out` - Minimum base received per liquidated pool position
    /// * `min_position_out` - Minimum `token` received by the instant trade
    ///
    /// Returns the proposal id.
    pub fn create_risky_proposal(
        env: Env,
        trader: Address,
        token: Address,
        lp_amount: Amount,
        limits: ProposalLimits,
        instant_trade_percentage: i128,
        min_divest_out: Vec<Amount>,
        min_position_out: Amount,
    ) -> Result<u32, Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        risky::create(
            &env,
            &params,
            &trader,
            &token,
            lp_amount,
            limits,
            instant_trade_percentage,
            &min_divest_out,
            min_position_out,
        )
    }

    /// Lock pool shares into a risky proposal
    ///
    /// Returns the proposal shares minted.
    pub fn invest_risky_proposal(
        env: Env,
        investor: Address,
        proposal_id: u32,
        lp_amount: Amount,
        min_divest_out: Vec<Amount>,
        min_position_out: Amount,
    ) -> Result<Amount, Error> {
        investor.require_auth();
        let params = storage::get_params(&env)?;
        risky::invest(
            &env,
            &params,
            &investor,
            proposal_id,
            lp_amount,
            &min_divest_out,
            min_position_out,
        )
    }

    /// Trade inside a risky proposal, between base and the proposal token
    pub fn proposal_exchange(
        env: Env,
        trader: Address,
        proposal_id: u32,
        from: Address,
        amount: Amount,
        amount_bound: Amount,
        exchange_type: ExchangeType,
    ) -> Result<(Amount, Amount), Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        validation::require_kind(&params, PoolKind::Basic)?;
        risky::exchange(&env, &params, proposal_id, &from, amount, amount_bound, exchange_type)
    }

    pub fn get_proposal_exchange_amount(
        env: Env,
        proposal_id: u32,
        from: Address,
        amount: Amount,
        exchange_type: ExchangeType,
    ) -> Result<Amount, Error> {
        let params = storage::get_params(&env)?;
        risky::quote_exchange(&env, &params, proposal_id, &from, amount, exchange_type)
    }

    /// Return proposal value to the pool as pool shares
    ///
    /// On risky pools burns `amount` proposal shares and sells the position
    /// slice with at least `min_base_out`. On invest pools reinvests the
    /// pending dividends; `amount` and `min_base_out` are unused.
    pub fn reinvest_proposal(
        env: Env,
        holder: Address,
        proposal_id: u32,
        amount: Amount,
        min_base_out: Amount,
    ) -> Result<Amount, Error> {
        holder.require_auth();
        let params = storage::get_params(&env)?;
        match params.kind {
            PoolKind::Basic => risky::reinvest(&env, &params, &holder, proposal_id, amount, min_base_out),
            PoolKind::Invest => invest::reinvest(&env, &params, &holder, proposal_id),
        }
    }

    /// Reinvest every proposal in the holder's active index
    ///
    /// `min_base_outs` follows the order of `get_active_investments` and is
    /// unused on invest pools.
    pub fn reinvest_all_proposals(env: Env, holder: Address, min_base_outs: Vec<Amount>) -> Result<Amount, Error> {
        holder.require_auth();
        let params = storage::get_params(&env)?;
        match params.kind {
            PoolKind::Basic => risky::reinvest_all(&env, &params, &holder, &min_base_outs),
            PoolKind::Invest => invest::reinvest_all(&env, &params, &holder),
        }
    }

    pub fn get_proposal_invest_tokens(
        env: Env,
        proposal_id: u32,
        lp_amount: Amount,
    ) -> Result<ProposalInvestQuote, Error> {
        let params = storage::get_params(&env)?;
        match params.kind {
            PoolKind::Basic => risky::quote_invest(&env, &params, proposal_id, lp_amount),
            PoolKind::Invest => invest::quote_invest(&env, &params, proposal_id, lp_amount),
        }
    }

    pub fn get_proposal_divest_amounts(
        env: Env,
        proposal_ids: Vec<u32>,
        amounts: Vec<Amount>,
    ) -> Result<Vec<ProposalDivestQuote>, Error> {
        let params = storage::get_params(&env)?;
        validation::require_kind(&params, PoolKind::Basic)?;
        risky::quote_divest(&env, &params, &proposal_ids, &amounts)
    }

    // ==================== Invest proposals ====================

    /// Create an invest proposal from the trader's pool shares
    pub fn create_invest_proposal(
        env: Env,
        trader: Address,
        lp_amount: Amount,
        limits: ProposalLimits,
        min_divest_out: Vec<Amount>,
    ) -> Result<u32, Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        invest::create(&env, &params, &trader, lp_amount, limits, &min_divest_out)
    }

    /// Lock pool shares into an invest proposal
    ///
    /// Returns the proposal shares minted, one per base token raised.
    pub fn invest_invest_proposal(
        env: Env,
        investor: Address,
        proposal_id: u32,
        lp_amount: Amount,
        min_divest_out: Vec<Amount>,
    ) -> Result<Amount, Error> {
        investor.require_auth();
        let params = storage::get_params(&env)?;
        invest::invest(&env, &params, &investor, proposal_id, lp_amount, &min_divest_out)
    }

    /// Withdraw raised capital to the trader
    pub fn withdraw_proposal(env: Env, trader: Address, proposal_id: u32, amount: Amount) -> Result<(), Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        invest::withdraw(&env, &params, proposal_id, amount)
    }

    /// Supply repayments to the holders of a proposal
    pub fn supply_proposal(env: Env, trader: Address, proposal_id: u32, amount: Amount) -> Result<(), Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        invest::supply(&env, &params, proposal_id, amount)
    }

    pub fn claim_proposal(env: Env, holder: Address, proposal_id: u32) -> Result<Amount, Error> {
        holder.require_auth();
        let params = storage::get_params(&env)?;
        invest::claim(&env, &params, &holder, proposal_id)
    }

    pub fn claim_all_proposals(env: Env, holder: Address) -> Result<Amount, Error> {
        holder.require_auth();
        let params = storage::get_params(&env)?;
        invest::claim_all(&env, &params, &holder)
    }

    /// Turn the unwithdrawn capital of a proposal into dividends
    pub fn convert_to_dividends(env: Env, trader: Address, proposal_id: u32) -> Result<Amount, Error> {
        trader.require_auth();
        let params = storage::get_params(&env)?;
        validation::require_trader(&params, &trader)?;
        invest::convert_to_dividends(&env, &params, proposal_id)
    }

    // ==================== Proposal shares ====================

    /// Transfer proposal shares together with their lock record
    pub fn transfer_proposal_shares(
        env: Env,
        from: Address,
        to: Address,
        proposal_id: u32,
        amount: Amount,
    ) -> Result<(), Error> {
        from.require_auth();
        let params = storage::get_params(&env)?;
        match params.kind {
            PoolKind::Basic => risky::transfer(&env, &params, &from, &to, proposal_id, amount),
            PoolKind::Invest => invest::transfer(&env, &from, &to, proposal_id, amount),
        }
    }

    pub fn get_risky_proposal(env: Env, proposal_id: u32) -> Result<RiskyProposal, Error> {
        storage::get_risky_proposal(&env, proposal_id)
    }

    pub fn get_invest_proposal(env: Env, proposal_id: u32) -> Result<InvestProposal, Error> {
        storage::get_invest_proposal(&env, proposal_id)
    }

    pub fn get_proposal_holder(env: Env, proposal_id: u32, holder: Address) -> ProposalHolder {
        storage::get_proposal_holder(&env, proposal_id, &holder)
    }

    /// Proposal ids in which the holder has a balance
    pub fn get_active_investments(env: Env, holder: Address) -> Vec<u32> {
        storage::get_active_investments(&env, &holder)
    }

    pub fn get_pending_dividends(env: Env, proposal_id: u32, holder: Address) -> Result<Amount, Error> {
        invest::pending_dividends(&env, proposal_id, &holder)
    }

    pub fn proposal_balance(env: Env, proposal_id: u32, holder: Address) -> Amount {
        ledger::balance(&env, &LedgerScope::Proposal(proposal_id), &holder)
    }

    pub fn proposal_supply(env: Env, proposal_id: u32) -> Amount {
        ledger::supply(&env, &LedgerScope::Proposal(proposal_id))
    }
}

//! Contract-level tests against a scripted router and configuration store.

mod pool;
mod sequence;

use crate::{TraderPool, TraderPoolClient};
use shared::constants::PRECISION;
use shared::types::{CommissionPeriod, CoreConfig, PoolKind, PoolParams};
use soroban_sdk::{
    contract, contractimpl, contracttype,
    testutils::{Address as _, Ledger},
    token::{StellarAssetClient, TokenClient},
    vec, Address, Env, String, Vec,
};

pub const MONTH: u64 = 30 * 24 * 60 * 60;
pub const DAY: u64 = 24 * 60 * 60;
/// Start well inside epoch 100 of a one-month period
pub const START: u64 = 100 * MONTH + DAY;

pub fn pct(percent: i128) -> i128 {
    percent * PRECISION
}

#[contracttype]
#[derive(Clone)]
enum MockKey {
    Price(Address),
    Config,
    Whitelisted(Address),
}

/// Constant-price router paying out of its own balance
#[contract]
pub struct MockPriceFeed;

#[contractimpl]
impl MockPriceFeed {
    /// Base token per unit of `token`, scaled by `PRECISION`
    pub fn set_price(env: Env, token: Address, price: i128) {
        env.storage().instance().set(&MockKey::Price(token), &price);
    }

    pub fn quote(env: Env, from: Address, to: Address, amount: i128) -> i128 {
        amount * price_of(&env, &from) / price_of(&env, &to)
    }

    pub fn quote_in(env: Env, from: Address, to: Address, amount_out: i128) -> i128 {
        let numerator = amount_out * price_of(&env, &to);
        let denominator = price_of(&env, &from);
        (numerator + denominator - 1) / denominator
    }

    pub fn swap(
        env: Env,
        recipient: Address,
        from: Address,
        to: Address,
        amount: i128,
        min_out: i128,
    ) -> i128 {
        let out = Self::quote(env.clone(), from, to.clone(), amount);
        if out < min_out {
            panic!("insufficient output");
        }
        TokenClient::new(&env, &to).transfer(&env.current_contract_address(), &recipient, &out);
        out
    }
}

fn price_of(env: &Env, token: &Address) -> i128 {
    env.storage()
        .instance()
        .get(&MockKey::Price(token.clone()))
        .unwrap_or(PRECISION)
}

#[contract]
pub struct MockCoreProperties;

#[contractimpl]
impl MockCoreProperties {
    pub fn set_config(env: Env, config: CoreConfig) {
        env.storage().instance().set(&MockKey::Config, &config);
    }

    pub fn set_whitelisted(env: Env, token: Address, allowed: bool) {
        env.storage()
            .instance()
            .set(&MockKey::Whitelisted(token), &allowed);
    }

    pub fn get_core_config(env: Env) -> CoreConfig {
        env.storage().instance().get(&MockKey::Config).unwrap()
    }

    pub fn is_whitelisted_token(env: Env, token: Address) -> bool {
        env.storage()
            .instance()
            .get(&MockKey::Whitelisted(token))
            .unwrap_or(false)
    }
}

pub struct Setup {
    pub env: Env,
    pub pool: TraderPoolClient<'static>,
    pub feed: MockPriceFeedClient<'static>,
    pub core: MockCorePropertiesClient<'static>,
    pub config: CoreConfig,
    pub trader: Address,
    pub base: Address,
    pub treasury: Address,
    pub dividends: Address,
    pub insurance: Address,
}

impl Setup {
    pub fn new(kind: PoolKind) -> Self {
        Self::build(kind, |_| {}, |_| {})
    }

    pub fn build(
        kind: PoolKind,
        tweak_config: impl FnOnce(&mut CoreConfig),
        tweak_params: impl FnOnce(&mut PoolParams),
    ) -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.ledger().set_timestamp(START);

        let trader = Address::generate(&env);
        let treasury = Address::generate(&env);
        let dividends = Address::generate(&env);
        let insurance = Address::generate(&env);

        let feed = MockPriceFeedClient::new(&env, &env.register_contract(None, MockPriceFeed));
        let core = MockCorePropertiesClient::new(&env, &env.register_contract(None, MockCoreProperties));

        let mut config = CoreConfig {
            max_pool_investors: 100,
            max_open_positions: 3,
            leverage_threshold: 2500,
            leverage_slope: 5,
            commission_durations: vec![&env, MONTH, 3 * MONTH, 12 * MONTH],
            min_trader_commission: pct(20),
            max_trader_commissions: vec![&env, pct(30), pct(50), pct(70)],
            dexe_commission_percentage: pct(30),
            dexe_commission_distribution: vec![&env, pct(33), pct(33), pct(33)],
            treasury: treasury.clone(),
            dividends: dividends.clone(),
            insurance: insurance.clone(),
            delay_for_risky_pool: DAY,
        };
        tweak_config(&mut config);
        core.set_config(&config);

        let admin = Address::generate(&env);
        let base = env.register_stellar_asset_contract(admin);
        StellarAssetClient::new(&env, &base).mint(&feed.address, &1_000_000_000_000);

        let mut params = PoolParams {
            trader: trader.clone(),
            base_token: base.clone(),
            base_decimals: 7,
            kind,
            private_pool: false,
            total_lp_emission: 0,
            minimal_investment: 100,
            commission_period: CommissionPeriod::Period1,
            commission_percentage: pct(30),
        };
        tweak_params(&mut params);

        let pool = TraderPoolClient::new(&env, &env.register_contract(None, TraderPool));
        pool.initialize(
            &params,
            &String::from_str(&env, "Trader Pool LP"),
            &String::from_str(&env, "TPLP"),
            &feed.address,
            &core.address,
        );

        Setup {
            env,
            pool,
            feed,
            core,
            config,
            trader,
            base,
            treasury,
            dividends,
            insurance,
        }
    }

    /// A whitelisted position token with router liquidity
    pub fn new_token(&self) -> Address {
        let admin = Address::generate(&self.env);
        let token = self.env.register_stellar_asset_contract(admin);
        StellarAssetClient::new(&self.env, &token).mint(&self.feed.address, &1_000_000_000_000);
        self.core.set_whitelisted(&token, &true);
        token
    }

    pub fn fund(&self, to: &Address, amount: i128) {
        StellarAssetClient::new(&self.env, &self.base).mint(to, &amount);
    }

    /// Fund and invest, accepting any swap output
    pub fn invest(&self, investor: &Address, amount: i128) -> i128 {
        self.fund(investor, amount);
        self.pool.invest(investor, &amount, &self.no_mins())
    }

    /// Zero minimums, one per open position
    pub fn no_mins(&self) -> Vec<i128> {
        let mut mins = Vec::new(&self.env);
        for _ in self.pool.get_open_positions().iter() {
            mins.push_back(0);
        }
        mins
    }

    pub fn set_price(&self, token: &Address, price: i128) {
        self.feed.set_price(token, &price);
    }

    pub fn advance(&self, seconds: u64) {
        let now = self.env.ledger().timestamp();
        self.env.ledger().set_timestamp(now + seconds);
    }

    pub fn token_balance(&self, token: &Address, holder: &Address) -> i128 {
        TokenClient::new(&self.env, token).balance(holder)
    }

    pub fn user(&self) -> Address {
        Address::generate(&self.env)
    }
}

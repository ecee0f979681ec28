use soroban_sdk::{contractclient, Address, Env};

use crate::types::CoreConfig;

/// Exchange router used for quotes and swaps
///
/// The caller transfers `amount` of `from` to the router before `swap`; the
/// router pays the output to `recipient` and fails when `min_out` is not met
/// or liquidity is insufficient.
#[contractclient(name = "PriceFeedClient")]
pub trait PriceFeed {
    fn quote(env: Env, from: Address, to: Address, amount: i128) -> i128;

    /// Amount of `from` needed to receive exactly `amount_out` of `to`
    fn quote_in(env: Env, from: Address, to: Address, amount_out: i128) -> i128;

    fn swap(
        env: Env,
        recipient: Address,
        from: Address,
        to: Address,
        amount: i128,
        min_out: i128,
    ) -> i128;
}

/// Global configuration store
#[contractclient(name = "CorePropertiesClient")]
pub trait CoreProperties {
    fn get_core_config(env: Env) -> CoreConfig;

    fn is_whitelisted_token(env: Env, token: Address) -> bool;
}

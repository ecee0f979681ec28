use super::{pct, Setup, MONTH};
use crate::{TraderPool, TraderPoolClient};
use shared::constants::PRECISION;
use shared::errors::Error;
use shared::types::{ExchangeType, PoolKind};
use soroban_sdk::{token::StellarAssetClient, vec, String, Vec};

#[test]
fn test_initialize_sets_metadata_once() {
    let s = Setup::new(PoolKind::Basic);

    assert_eq!(s.pool.decimals(), 7);
    assert_eq!(s.pool.symbol(), String::from_str(&s.env, "TPLP"));
    assert_eq!(s.pool.total_supply(), 0);

    let params = s.pool.get_pool_info().params;
    let result = s.pool.try_initialize(
        &params,
        &String::from_str(&s.env, "Again"),
        &String::from_str(&s.env, "AG"),
        &s.feed.address,
        &s.core.address,
    );
    assert_eq!(result, Err(Ok(Error::AlreadyInit)));
}

#[test]
fn test_initialize_rejects_commission_outside_tiers() {
    let s = Setup::new(PoolKind::Basic);
    let mut params = s.pool.get_pool_info().params;
    params.commission_percentage = pct(60);

    let fresh = TraderPoolClient::new(&s.env, &s.env.register_contract(None, TraderPool));
    let result = fresh.try_initialize(
        &params,
        &String::from_str(&s.env, "LP"),
        &String::from_str(&s.env, "LP"),
        &s.feed.address,
        &s.core.address,
    );
    assert_eq!(result, Err(Ok(Error::InvParams)));

    params.commission_percentage = pct(10);
    let result = fresh.try_initialize(
        &params,
        &String::from_str(&s.env, "LP"),
        &String::from_str(&s.env, "LP"),
        &s.feed.address,
        &s.core.address,
    );
    assert_eq!(result, Err(Ok(Error::InvParams)));
}

#[test]
fn test_first_investments_mint_one_to_one() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();

    assert_eq!(s.invest(&s.trader, 1000), 1000);
    assert_eq!(s.invest(&alice, 1000), 1000);

    assert_eq!(s.pool.balance(&alice), 1000);
    assert_eq!(s.pool.total_supply(), 2000);
    assert_eq!(s.pool.get_valuation().total_value, 2000);

    let view = s.pool.get_investor_info(&alice);
    assert_eq!(view.info.invested_base, 1000);
    assert_eq!(view.info.high_water_mark, 1000);
    assert_eq!(view.value, 1000);

    // only non-trader holders are registered
    assert_eq!(s.pool.get_investors(&0, &10), vec![&s.env, alice.clone()]);
}

#[test]
fn test_minimal_investment_spares_the_seeding_trader() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();

    assert_eq!(s.invest(&s.trader, 10), 10);

    s.fund(&alice, 50);
    let result = s.pool.try_invest(&alice, &50, &Vec::new(&s.env));
    assert_eq!(result, Err(Ok(Error::UnderInvest)));

    s.fund(&s.trader, 50);
    let result = s.pool.try_invest(&s.trader, &50, &Vec::new(&s.env));
    assert_eq!(result, Err(Ok(Error::UnderInvest)));
}

#[test]
fn test_private_pool_allow_list() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    s.pool.change_pool_parameters(&s.trader, &true, &0, &100);

    s.fund(&alice, 500);
    let result = s.pool.try_invest(&alice, &500, &Vec::new(&s.env));
    assert_eq!(result, Err(Ok(Error::PrivatePool)));

    s.pool
        .modify_private_investors(&s.trader, &vec![&s.env, alice.clone()], &true);
    s.pool.invest(&alice, &500, &Vec::new(&s.env));

    let result = s.pool
        .try_modify_private_investors(&s.trader, &vec![&s.env, alice.clone()], &false);
    assert_eq!(result, Err(Ok(Error::InvestorHasShares)));

    // shares cannot leave the allow-list either
    let bob = s.user();
    let result = s.pool.try_transfer(&alice, &bob, &100);
    assert_eq!(result, Err(Ok(Error::PrivatePool)));
}

#[test]
fn test_investor_and_emission_limits() {
    let s = Setup::build(
        PoolKind::Basic,
        |config| config.max_pool_investors = 1,
        |params| params.total_lp_emission = 2500,
    );
    let alice = s.user();
    let bob = s.user();

    s.invest(&s.trader, 1000);
    s.invest(&alice, 1000);

    s.fund(&bob, 200);
    let result = s.pool.try_invest(&bob, &200, &Vec::new(&s.env));
    assert_eq!(result, Err(Ok(Error::InvestorsLim)));

    // an existing investor may top up until the emission cap
    s.fund(&alice, 600);
    let result = s.pool.try_invest(&alice, &600, &Vec::new(&s.env));
    assert_eq!(result, Err(Ok(Error::EmissionLim)));
    assert_eq!(s.invest(&alice, 500), 500);

    let result = s.pool.try_change_pool_parameters(&s.trader, &false, &2000, &100);
    assert_eq!(result, Err(Ok(Error::EmissionLim)));
}

#[test]
fn test_round_trip_position_then_partial_divest() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    let token = s.new_token();

    s.invest(&alice, 1000);
    assert_eq!(s.pool.balance(&alice), 1000);

    // the leverage check runs on every position-opening trade
    s.pool
        .exchange(&s.trader, &s.base, &token, &500, &500, &ExchangeType::FromExact);
    assert_eq!(s.pool.get_open_positions(), vec![&s.env, token.clone()]);
    let info = s.pool.get_leverage_info();
    assert_eq!(info.positions_value, 500);
    assert_eq!(info.max_leverage, 2400);

    s.pool
        .exchange(&s.trader, &token, &s.base, &500, &500, &ExchangeType::FromExact);
    assert!(s.pool.get_open_positions().is_empty());
    assert_eq!(s.pool.get_valuation().base_balance, 1000);

    let paid = s.pool.divest(&alice, &500, &Vec::new(&s.env), &false);
    assert_eq!(paid, 500);
    assert_eq!(s.token_balance(&s.base, &alice), 500);
    assert_eq!(s.pool.get_investor_info(&alice).info.invested_base, 500);
    assert_eq!(s.pool.total_supply(), 500);
}

#[test]
fn test_invest_into_active_pool_follows_value_shares() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    let token = s.new_token();
    s.set_price(&token, 2 * PRECISION);

    s.invest(&s.trader, 1000);
    let (spent, received) = s.pool
        .exchange(&s.trader, &s.base, &token, &400, &0, &ExchangeType::FromExact);
    assert_eq!((spent, received), (400, 200));

    let quote = s.pool.get_invest_tokens(&500);
    assert_eq!(quote.lp_amount, 500);
    assert_eq!(quote.base_kept, 300);
    assert_eq!(quote.given_amounts, vec![&s.env, 200]);
    assert_eq!(quote.received_amounts, vec![&s.env, 100]);

    s.fund(&alice, 500);
    let minted = s.pool.invest(&alice, &500, &vec![&s.env, 100]);
    assert_eq!(minted, quote.lp_amount);

    let valuation = s.pool.get_valuation();
    assert_eq!(valuation.base_balance, 900);
    assert_eq!(valuation.position_balances, vec![&s.env, 300]);
    assert_eq!(valuation.total_value, 1500);
}

#[test]
fn test_divest_releases_proportional_slices() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    let token = s.new_token();
    s.set_price(&token, 2 * PRECISION);

    s.invest(&s.trader, 1000);
    s.pool
        .exchange(&s.trader, &s.base, &token, &400, &0, &ExchangeType::FromExact);
    s.invest(&alice, 500);

    // in kind
    let quote = s.pool.get_divest_amounts(&alice, &300);
    assert_eq!(quote.base_amount, 180);
    assert_eq!(quote.position_amounts, vec![&s.env, 60]);
    assert_eq!(quote.position_values, vec![&s.env, 120]);
    assert_eq!(quote.commission.total_shares(), Ok(0));

    let paid = s.pool.divest(&alice, &300, &Vec::new(&s.env), &false);
    assert_eq!(paid, quote.base_amount);
    assert_eq!(s.token_balance(&s.base, &alice), 180);
    assert_eq!(s.token_balance(&token, &alice), 60);
    assert_eq!(s.pool.get_investor_info(&alice).info.invested_base, 200);

    // liquidated
    let result = s.pool.try_divest(&alice, &200, &Vec::new(&s.env), &true);
    assert_eq!(result, Err(Ok(Error::LenMismatch)));

    let paid = s.pool.divest(&alice, &200, &vec![&s.env, 80], &true);
    assert_eq!(paid, 120 + 80);
    assert_eq!(s.pool.balance(&alice), 0);

    let view = s.pool.get_investor_info(&alice);
    assert_eq!(view.info.invested_base, 0);
    assert_eq!(view.info.commission_unlock_epoch, 0);
    assert!(s.pool.get_investors(&0, &10).is_empty());
}

#[test]
fn test_exchange_whitelist_and_position_rules() {
    let s = Setup::build(PoolKind::Basic, |config| config.max_open_positions = 1, |_| {});
    let alice = s.user();
    let first = s.new_token();
    let second = s.new_token();
    let unlisted = s.new_token();
    s.core.set_whitelisted(&unlisted, &false);

    s.invest(&s.trader, 1000);

    let result = s.pool
        .try_exchange(&alice, &s.base, &first, &100, &0, &ExchangeType::FromExact);
    assert_eq!(result, Err(Ok(Error::Unauthorized)));

    let result = s.pool
        .try_exchange(&s.trader, &s.base, &unlisted, &100, &0, &ExchangeType::FromExact);
    assert_eq!(result, Err(Ok(Error::NotWhitelisted)));

    let result = s.pool
        .try_exchange(&s.trader, &second, &s.base, &100, &0, &ExchangeType::FromExact);
    assert_eq!(result, Err(Ok(Error::PositionNotOpen)));

    let result = s.pool
        .try_exchange(&s.trader, &s.base, &s.base, &100, &0, &ExchangeType::FromExact);
    assert_eq!(result, Err(Ok(Error::SameToken)));

    s.pool
        .exchange(&s.trader, &s.base, &first, &300, &300, &ExchangeType::FromExact);

    let result = s.pool
        .try_exchange(&s.trader, &s.base, &second, &100, &0, &ExchangeType::FromExact);
    assert_eq!(result, Err(Ok(Error::PositionsLim)));

    // closing toward base survives a delisting
    s.core.set_whitelisted(&first, &false);
    s.pool
        .exchange(&s.trader, &first, &s.base, &300, &300, &ExchangeType::FromExact);
    assert!(s.pool.get_open_positions().is_empty());
    assert_eq!(s.pool.get_valuation().base_balance, 1000);
}

#[test]
fn test_exchange_to_exact_respects_bound() {
    let s = Setup::new(PoolKind::Basic);
    let token = s.new_token();
    s.set_price(&token, 2 * PRECISION);
    s.invest(&s.trader, 1000);

    assert_eq!(s.pool.get_exchange_to_exact_amount(&s.base, &token, &100), 200);
    assert_eq!(s.pool.get_exchange_from_exact_amount(&s.base, &token, &200), 100);

    let result = s.pool
        .try_exchange(&s.trader, &s.base, &token, &100, &199, &ExchangeType::ToExact);
    assert_eq!(result, Err(Ok(Error::Slippage)));

    let result = s.pool
        .try_exchange(&s.trader, &s.base, &token, &600, &2000, &ExchangeType::ToExact);
    assert_eq!(result, Err(Ok(Error::InsufBalance)));

    let (spent, received) = s.pool
        .exchange(&s.trader, &s.base, &token, &100, &200, &ExchangeType::ToExact);
    assert_eq!((spent, received), (200, 100));
    assert_eq!(s.pool.get_valuation().base_balance, 800);
}

#[test]
fn test_leverage_allowance_follows_pool_value() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    let bob = s.user();
    let token = s.new_token();

    // the trader holds no shares of its own
    s.invest(&alice, 1000);
    let info = s.pool.get_leverage_info();
    assert_eq!(info.positions_value, 0);
    assert_eq!(info.max_leverage, 2400);

    s.pool
        .exchange(&s.trader, &s.base, &token, &500, &0, &ExchangeType::FromExact);
    assert_eq!(s.pool.get_leverage_info().positions_value, 500);

    s.invest(&bob, 9000);
    let info = s.pool.get_leverage_info();
    assert_eq!(info.positions_value, 5000);
    assert_eq!(info.max_leverage, 30000);

    s.pool
        .exchange(&s.trader, &s.base, &token, &5000, &0, &ExchangeType::FromExact);
    assert_eq!(s.pool.get_leverage_info().positions_value, 10000);
}

#[test]
fn test_zero_threshold_disables_leverage_cap() {
    let s = Setup::build(PoolKind::Basic, |config| config.leverage_threshold = 0, |_| {});
    let token = s.new_token();
    s.invest(&s.trader, 1000);

    s.pool
        .exchange(&s.trader, &s.base, &token, &1000, &0, &ExchangeType::FromExact);
    let info = s.pool.get_leverage_info();
    assert_eq!(info.positions_value, 1000);
    assert_eq!(info.max_leverage, 0);
}

#[test]
fn test_eighteen_decimal_base_amounts() {
    let s = Setup::build(PoolKind::Basic, |_| {}, |params| params.base_decimals = 18);
    let unit: i128 = 1_000_000_000_000_000_000;
    let alice = s.user();
    let bob = s.user();
    let token = s.new_token();
    StellarAssetClient::new(&s.env, &token).mint(&s.feed.address, &(1000 * unit));
    assert_eq!(s.pool.decimals(), 18);

    assert_eq!(s.invest(&alice, 100 * unit), 100 * unit);
    let paid = s.pool.divest(&alice, &(50 * unit), &Vec::new(&s.env), &false);
    assert_eq!(paid, 50 * unit);
    assert_eq!(s.pool.get_investor_info(&alice).info.invested_base, 50 * unit);

    assert_eq!(s.invest(&bob, 300 * unit), 300 * unit);
    s.pool.exchange(
        &s.trader,
        &s.base,
        &token,
        &(100 * unit),
        &0,
        &ExchangeType::FromExact,
    );
    s.set_price(&token, 2 * PRECISION);
    assert_eq!(s.pool.get_valuation().total_value, 450 * unit);
    assert_eq!(s.pool.get_investor_info(&alice).value, 450 * unit / 7);

    s.advance(MONTH);
    let charge = s.pool.reinvest_commission(&s.trader, &0, &10);
    assert!(charge.base_commission > 0);
    assert_eq!(
        s.pool.balance(&s.trader)
            + s.pool.balance(&alice)
            + s.pool.balance(&bob)
            + s.pool.balance(&s.treasury)
            + s.pool.balance(&s.dividends)
            + s.pool.balance(&s.insurance),
        s.pool.total_supply()
    );
}

#[test]
fn test_transfer_moves_principal_and_registry() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    let bob = s.user();

    s.invest(&alice, 1000);
    s.pool.transfer(&alice, &bob, &400);

    assert_eq!(s.pool.get_investor_info(&alice).info.invested_base, 600);
    assert_eq!(s.pool.get_investor_info(&bob).info.invested_base, 400);
    assert_eq!(s.pool.get_pool_info().investors_count, 2);

    s.pool.transfer(&alice, &bob, &600);
    assert_eq!(s.pool.get_investors(&0, &10), vec![&s.env, bob.clone()]);
    assert_eq!(s.pool.get_investor_info(&bob).info.invested_base, 1000);
    assert_eq!(s.pool.balance(&alice) + s.pool.balance(&bob), s.pool.total_supply());

    let result = s.pool.try_transfer(&alice, &bob, &1);
    assert_eq!(result, Err(Ok(Error::InsufShares)));
}

#[test]
fn test_registry_swap_removes_deterministically() {
    let s = Setup::new(PoolKind::Basic);
    let first = s.user();
    let second = s.user();
    let third = s.user();

    s.invest(&first, 100);
    s.invest(&second, 100);
    s.invest(&third, 100);

    s.pool.divest(&first, &100, &Vec::new(&s.env), &false);
    assert_eq!(
        s.pool.get_investors(&0, &10),
        vec![&s.env, third.clone(), second.clone()]
    );
    assert_eq!(s.pool.get_investors(&1, &1), vec![&s.env, second.clone()]);
}

#[test]
fn test_failed_invest_leaves_state_unchanged() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    let token = s.new_token();

    s.invest(&s.trader, 1000);
    s.pool
        .exchange(&s.trader, &s.base, &token, &500, &0, &ExchangeType::FromExact);
    let before = s.pool.get_pool_info();

    s.fund(&alice, 400);
    let result = s.pool.try_invest(&alice, &400, &Vec::new(&s.env));
    assert_eq!(result, Err(Ok(Error::LenMismatch)));

    assert_eq!(s.pool.get_pool_info(), before);
    assert_eq!(s.token_balance(&s.base, &alice), 400);
    assert_eq!(s.pool.balance(&alice), 0);
}

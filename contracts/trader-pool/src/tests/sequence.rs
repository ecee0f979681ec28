use super::{Setup, MONTH};
use shared::constants::PRECISION;
use shared::types::{ExchangeType, PoolKind, ProposalLimits};
use soroban_sdk::{vec, Address, Vec};

/// Share ledgers, lock records and the registry all agree
fn assert_books(s: &Setup, holders: &[&Address]) {
    let held: i128 = holders.iter().map(|holder| s.pool.balance(holder)).sum();
    assert_eq!(held, s.pool.total_supply());

    let state = s.pool.get_pool_info().state;
    let mut locked = 0;
    for id in 1..=state.proposals_count {
        let proposal = s.pool.get_risky_proposal(&id);
        let held: i128 = holders
            .iter()
            .map(|holder| s.pool.proposal_balance(&id, holder))
            .sum();
        assert_eq!(held, s.pool.proposal_supply(&id));

        let records: i128 = holders
            .iter()
            .map(|holder| s.pool.get_proposal_holder(&id, holder).locked_lp)
            .sum();
        assert_eq!(records, proposal.locked_lp);
        locked += proposal.locked_lp;
    }
    assert_eq!(locked, state.total_locked_lp);

    let registry = s.pool.get_investors(&0, &50);
    let mut holding = 0;
    for holder in holders.iter().filter(|holder| ***holder != s.trader) {
        let balance = s.pool.balance(holder);
        let info = s.pool.get_investor_info(holder).info;
        assert_eq!(registry.contains(*holder), balance > 0);
        assert_eq!(info.commission_unlock_epoch != 0, balance > 0);
        if balance == 0 {
            assert_eq!(info.invested_base, 0);
        } else {
            holding += 1;
        }
    }
    assert_eq!(registry.len(), holding);
}

#[test]
fn test_mixed_sequence_keeps_books_balanced() {
    let s = Setup::new(PoolKind::Basic);
    let alice = s.user();
    let bob = s.user();
    let token = s.new_token();
    let holders = [&s.trader, &alice, &bob, &s.treasury, &s.dividends, &s.insurance];

    s.invest(&s.trader, 1000);
    assert_books(&s, &holders);
    s.invest(&alice, 1000);
    assert_books(&s, &holders);

    s.pool
        .exchange(&s.trader, &s.base, &token, &600, &0, &ExchangeType::FromExact);
    s.set_price(&token, 2 * PRECISION);
    assert_books(&s, &holders);

    s.invest(&bob, 700);
    assert_books(&s, &holders);

    s.pool.transfer(&alice, &bob, &300);
    assert_books(&s, &holders);

    let limits = ProposalLimits {
        timestamp_limit: 0,
        max_invested_base: 0,
        max_token_price: 0,
    };
    let id = s.pool.create_risky_proposal(
        &s.trader,
        &token,
        &300,
        &limits,
        &(50 * PRECISION),
        &vec![&s.env, 0],
        &0,
    );
    assert_books(&s, &holders);

    s.advance(MONTH);
    s.pool
        .invest_risky_proposal(&alice, &id, &100, &vec![&s.env, 0], &0);
    assert_books(&s, &holders);

    let charge = s.pool.reinvest_commission(&s.trader, &0, &10);
    assert!(charge.base_commission > 0);
    assert_books(&s, &holders);

    let half = s.pool.balance(&bob) / 2;
    s.pool.divest(&bob, &half, &Vec::new(&s.env), &false);
    assert_books(&s, &holders);

    let stake = s.pool.proposal_balance(&id, &alice);
    s.pool.reinvest_proposal(&alice, &id, &stake, &0);
    assert_books(&s, &holders);

    s.set_price(&token, PRECISION);
    let position = s.pool.get_valuation().position_balances.get(0).unwrap();
    s.pool
        .exchange(&s.trader, &token, &s.base, &position, &0, &ExchangeType::FromExact);
    assert!(s.pool.get_open_positions().is_empty());
    assert_books(&s, &holders);

    s.pool.reinvest_all_proposals(&s.trader, &vec![&s.env, 0]);
    assert_books(&s, &holders);
    let state = s.pool.get_pool_info().state;
    assert_eq!(state.total_locked_lp, 0);
    assert_eq!(state.risky_token, None);
    assert_eq!(s.pool.proposal_supply(&id), 0);

    let rest = s.pool.balance(&bob);
    s.pool.transfer(&bob, &alice, &rest);
    assert_books(&s, &holders);
    assert!(!s.pool.get_investors(&0, &50).contains(&bob));
}

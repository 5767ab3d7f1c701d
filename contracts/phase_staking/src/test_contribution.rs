extern crate std;

use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    token::StellarAssetClient,
    Address, Env,
};

use crate::{PhaseContribution, PhaseStakingContract, PhaseStakingContractClient};

const DAY: u64 = 86_400;
const PHASE_DURATION: u64 = 10 * DAY;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn setup() -> (Env, PhaseStakingContractClient<'static>, Address, Address) {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().set_timestamp(0);

    let stake_token = env.register_stellar_asset_contract_v2(Address::generate(&env));

    let contract_id = env.register(PhaseStakingContract, ());
    let client = PhaseStakingContractClient::new(&env, &contract_id);

    let admin = Address::generate(&env);
    client.initialize(&admin, &stake_token.address());

    (env, client, admin, stake_token.address())
}

/// A fresh address holding `amount` stake tokens.
fn funded_user(env: &Env, stake_token: &Address, amount: i128) -> Address {
    let user = Address::generate(env);
    StellarAssetClient::new(env, stake_token).mint(&user, &amount);
    user
}

fn contribution(user: i128, total: i128) -> PhaseContribution {
    PhaseContribution { user, total }
}

// ── Single staker ─────────────────────────────────────────────────────────────

#[test]
fn test_full_phase_single_staker() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 1_000);

    client.stake(&staker, &1_000);

    env.ledger().set_timestamp(100);
    client.start_phase(&admin, &PHASE_DURATION);

    env.ledger().set_timestamp(100 + PHASE_DURATION);
    let expected = 1_000 * PHASE_DURATION as i128;
    assert_eq!(
        client.contribution_in_phase(&staker, &0),
        contribution(expected, expected)
    );
}

#[test]
fn test_open_phase_grows_with_time_then_freezes() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 1_000);

    client.stake(&staker, &1_000);
    client.start_phase(&admin, &100);

    // Nothing has elapsed at the start instant.
    assert_eq!(client.contribution_in_phase(&staker, &0).user, 0);

    env.ledger().set_timestamp(30);
    assert_eq!(client.contribution_in_phase(&staker, &0).user, 30_000);

    env.ledger().set_timestamp(60);
    assert_eq!(client.contribution_in_phase(&staker, &0).user, 60_000);

    env.ledger().set_timestamp(150);
    let closed = client.contribution_in_phase(&staker, &0);
    assert_eq!(closed.user, 100_000);

    // A closed phase reads the same forever.
    assert_eq!(client.contribution_in_phase(&staker, &0), closed);
    env.ledger().set_timestamp(10_000);
    assert_eq!(client.contribution_in_phase(&staker, &0), closed);
}

#[test]
fn test_user_who_never_staked_has_no_contribution() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 1_000);
    let bystander = Address::generate(&env);

    client.stake(&staker, &1_000);
    client.start_phase(&admin, &100);
    env.ledger().set_timestamp(100);
    client.start_phase(&admin, &100);
    env.ledger().set_timestamp(250);

    for index in 0..2u32 {
        let result = client.contribution_in_phase(&bystander, &index);
        assert_eq!(result.user, 0);
        assert_eq!(result.total, 100_000);
    }
}

// ── Multiple stakers ──────────────────────────────────────────────────────────

#[test]
fn test_late_joiner_accrues_half_phase() {
    let (env, client, admin, stake_token) = setup();
    let early = funded_user(&env, &stake_token, 1_000);
    let late = funded_user(&env, &stake_token, 4_000);

    client.stake(&early, &1_000);
    client.start_phase(&admin, &PHASE_DURATION);

    env.ledger().set_timestamp(PHASE_DURATION / 2);
    client.stake(&late, &4_000);

    env.ledger().set_timestamp(PHASE_DURATION);
    let early_result = client.contribution_in_phase(&early, &0);
    let late_result = client.contribution_in_phase(&late, &0);

    assert_eq!(early_result.user, 1_000 * PHASE_DURATION as i128);
    assert_eq!(late_result.user, 4_000 * (PHASE_DURATION / 2) as i128);
    assert_eq!(early_result.total, early_result.user + late_result.user);
    assert_eq!(late_result.total, early_result.total);
}

#[test]
fn test_total_is_sum_of_users() {
    let (env, client, admin, stake_token) = setup();
    let a = funded_user(&env, &stake_token, 10_000);
    let b = funded_user(&env, &stake_token, 10_000);
    let c = funded_user(&env, &stake_token, 10_000);

    client.stake(&a, &3_000);
    env.ledger().set_timestamp(5);
    client.start_phase(&admin, &1_000);

    env.ledger().set_timestamp(120);
    client.stake(&b, &700);
    env.ledger().set_timestamp(300);
    client.unstake(&a, &2_500);
    client.stake(&c, &9_000);
    env.ledger().set_timestamp(640);
    client.unstake(&c, &9_000);
    client.stake(&a, &1);
    env.ledger().set_timestamp(2_000);

    let users = [&a, &b, &c];
    let sum: i128 = users
        .iter()
        .map(|u| client.contribution_in_phase(u, &0).user)
        .sum();
    assert_eq!(client.contribution_in_phase(&a, &0).total, sum);
}

// ── Consecutive phases ────────────────────────────────────────────────────────

#[test]
fn test_back_to_back_phases_are_independent() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 1_000);
    let first = PHASE_DURATION;
    let second = 7 * DAY;

    client.stake(&staker, &1_000);
    client.start_phase(&admin, &first);

    env.ledger().set_timestamp(first);
    let phase0 = client.contribution_in_phase(&staker, &0);
    assert_eq!(phase0.user, 1_000 * first as i128);

    client.start_phase(&admin, &second);
    env.ledger().set_timestamp(first + second);

    assert_eq!(client.contribution_in_phase(&staker, &0), phase0);
    assert_eq!(
        client.contribution_in_phase(&staker, &1).user,
        1_000 * second as i128
    );
}

#[test]
fn test_partial_unstake_mid_phase() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 1_000);
    let first = PHASE_DURATION;
    let second = 8 * DAY;

    client.stake(&staker, &1_000);
    client.start_phase(&admin, &first);
    env.ledger().set_timestamp(first);
    client.start_phase(&admin, &second);

    env.ledger().set_timestamp(first + second / 4);
    client.unstake(&staker, &750);

    env.ledger().set_timestamp(first + second);
    let expected = 1_000 * (second / 4) as i128 + 250 * (3 * second / 4) as i128;
    assert_eq!(
        client.contribution_in_phase(&staker, &1),
        contribution(expected, expected)
    );
    assert_eq!(
        client.contribution_in_phase(&staker, &0).user,
        1_000 * first as i128
    );
}

#[test]
fn test_overlapping_phases_both_accrue() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 10);

    client.stake(&staker, &10);
    client.start_phase(&admin, &100);

    // The next phase starts before the first one's duration has elapsed.
    env.ledger().set_timestamp(40);
    client.start_phase(&admin, &100);

    env.ledger().set_timestamp(500);
    assert_eq!(client.contribution_in_phase(&staker, &0).user, 1_000);
    assert_eq!(client.contribution_in_phase(&staker, &1).user, 1_000);
}

// ── Edge cases ────────────────────────────────────────────────────────────────

#[test]
fn test_fully_unstaked_before_phase_counts_zero() {
    let (env, client, admin, stake_token) = setup();
    let leaver = funded_user(&env, &stake_token, 500);
    let stayer = funded_user(&env, &stake_token, 300);

    client.stake(&leaver, &500);
    client.stake(&stayer, &300);
    env.ledger().set_timestamp(10);
    client.unstake(&leaver, &500);

    env.ledger().set_timestamp(20);
    client.start_phase(&admin, &100);
    env.ledger().set_timestamp(200);

    // The zero checkpoint governs, not the older 500 one.
    assert_eq!(client.get_checkpoint_count(&leaver), 2);
    assert_eq!(
        client.contribution_in_phase(&leaver, &0),
        contribution(0, 30_000)
    );
}

#[test]
fn test_stake_and_unstake_in_same_instant_inside_phase() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 2_000);

    client.start_phase(&admin, &100);

    env.ledger().set_timestamp(50);
    client.stake(&staker, &2_000);
    client.unstake(&staker, &1_500);

    env.ledger().set_timestamp(100);
    // Only the final 500 counts for the second half.
    assert_eq!(
        client.contribution_in_phase(&staker, &0),
        contribution(25_000, 25_000)
    );
}

#[test]
fn test_stake_exactly_at_phase_end_is_excluded() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 1_000);

    client.start_phase(&admin, &100);
    env.ledger().set_timestamp(100);
    client.stake(&staker, &1_000);

    env.ledger().set_timestamp(1_000);
    assert_eq!(
        client.contribution_in_phase(&staker, &0),
        contribution(0, 0)
    );
}

#[test]
fn test_history_search_over_many_checkpoints() {
    let (env, client, admin, stake_token) = setup();
    let staker = funded_user(&env, &stake_token, 1_000);

    // 20 checkpoints before the phase; only the last balance carries over.
    for step in 0..10u64 {
        env.ledger().set_timestamp(step * 10);
        client.stake(&staker, &100);
        env.ledger().set_timestamp(step * 10 + 5);
        client.unstake(&staker, &50);
    }
    assert_eq!(client.get_stake(&staker), 500);

    env.ledger().set_timestamp(1_000);
    client.start_phase(&admin, &10);
    env.ledger().set_timestamp(2_000);

    assert_eq!(client.contribution_in_phase(&staker, &0).user, 5_000);
    assert_eq!(client.get_stake_at(&staker, &47), 250);
}

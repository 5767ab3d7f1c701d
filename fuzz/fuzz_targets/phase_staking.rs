#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use phase_staking::{PhaseStakingContract, PhaseStakingContractClient};
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    token::StellarAssetClient,
    Address, Env,
};

#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    Stake { amount: u32 },
    Unstake { amount: u32 },
    StartPhase { duration: u32 },
    Advance { seconds: u16 },
    Query { phase: u8 },
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();

    let admin = Address::generate(&env);
    let stake_token = env.register_stellar_asset_contract_v2(admin.clone());
    let contract_id = env.register(PhaseStakingContract, ());
    let client = PhaseStakingContractClient::new(&env, &contract_id);
    client.initialize(&admin, &stake_token.address());

    let minter = StellarAssetClient::new(&env, &stake_token.address());
    let mut users = vec![admin.clone()];
    for _ in 0..4 {
        users.push(Address::generate(&env));
    }
    for user in &users {
        minter.mint(user, &(u32::MAX as i128 * 64));
    }

    let mut now = 0u64;
    for (i, action) in actions.into_iter().enumerate() {
        let caller = &users[i % users.len()];
        match action {
            FuzzAction::Stake { amount } => {
                let _ = client.try_stake(caller, &(amount as i128));
            }
            FuzzAction::Unstake { amount } => {
                let _ = client.try_unstake(caller, &(amount as i128));
            }
            FuzzAction::StartPhase { duration } => {
                let _ = client.try_start_phase(caller, &(duration as u64));
            }
            FuzzAction::Advance { seconds } => {
                now += seconds as u64;
                env.ledger().set_timestamp(now);
            }
            FuzzAction::Query { phase } => {
                let index = phase as u32;
                if index >= client.phase_count() {
                    continue;
                }
                // Total contribution must equal the sum over every staker.
                let mut sum = 0i128;
                let mut total = None;
                for user in &users {
                    let result = client.contribution_in_phase(user, &index);
                    sum += result.user;
                    total = Some(result.total);
                }
                assert_eq!(total, Some(sum));
            }
        }

        let staked: i128 = users.iter().map(|u| client.get_stake(u)).sum();
        assert_eq!(client.get_total_stake(), staked);
    }
});

use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

use crate::checkpoint::{self, Checkpoint};
use crate::ContractError;

const ACCOUNT: Symbol = symbol_short!("ACCT");

const TTL_THRESHOLD: u32 = 518_400;
const TTL_EXTEND_TO: u32 = 2_073_600;

/// Owner of a balance and its checkpoint history.
///
/// The system-wide total is tracked as its own account so that it goes through
/// exactly the same bookkeeping as every user.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Account {
    User(Address),
    Total,
}

/// Current balance plus the length of the account's checkpoint history.
///
/// `balance` always equals the balance of the last checkpoint, or 0 while the
/// history is empty.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccountState {
    pub balance: i128,
    pub checkpoints: u32,
}

fn account_key(account: &Account) -> (Symbol, Account) {
    (ACCOUNT, account.clone())
}

pub fn load(env: &Env, account: &Account) -> AccountState {
    let key = account_key(account);
    let state: Option<AccountState> = env.storage().persistent().get(&key);
    match state {
        Some(state) => {
            env.storage()
                .persistent()
                .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
            state
        }
        None => AccountState::default(),
    }
}

fn save(env: &Env, account: &Account, state: &AccountState) {
    let key = account_key(account);
    env.storage().persistent().set(&key, state);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// Set the account's balance and append the matching checkpoint stamped `now`.
fn record(
    env: &Env,
    account: &Account,
    mut state: AccountState,
    balance: i128,
) -> Result<i128, ContractError> {
    let next = state
        .checkpoints
        .checked_add(1)
        .ok_or(ContractError::ArithmeticOverflow)?;
    let now = env.ledger().timestamp();
    checkpoint::write(
        env,
        account,
        state.checkpoints,
        &Checkpoint {
            balance,
            timestamp: now,
        },
    );
    state.balance = balance;
    state.checkpoints = next;
    save(env, account, &state);
    Ok(balance)
}

/// Increase `account` by `amount`, returning the new balance.
pub fn credit(env: &Env, account: &Account, amount: i128) -> Result<i128, ContractError> {
    let state = load(env, account);
    let balance = state
        .balance
        .checked_add(amount)
        .ok_or(ContractError::ArithmeticOverflow)?;
    record(env, account, state, balance)
}

/// Decrease `account` by `amount`, returning the new balance.
///
/// Fails with `InsufficientBalance` rather than going negative.
pub fn debit(env: &Env, account: &Account, amount: i128) -> Result<i128, ContractError> {
    let state = load(env, account);
    if state.balance < amount {
        return Err(ContractError::InsufficientBalance);
    }
    let balance = state.balance - amount;
    record(env, account, state, balance)
}

pub fn balance(env: &Env, account: &Account) -> i128 {
    load(env, account).balance
}

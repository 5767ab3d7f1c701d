//! Append-only balance histories and the time-weighted integral over them.
//!
//! Every account (each user, plus the system-wide total) owns an ordered log of
//! [`Checkpoint`]s. A checkpoint never changes once written; historical balances
//! and contributions are rebuilt by binary-searching the log by timestamp.

use soroban_sdk::{contracttype, symbol_short, Env, Symbol};

use crate::ledger::{self, Account};
use crate::ContractError;

const CHECKPOINT: Symbol = symbol_short!("CKPT");

const TTL_THRESHOLD: u32 = 518_400;
const TTL_EXTEND_TO: u32 = 2_073_600;

/// "Balance became `balance` starting at `timestamp`."
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Checkpoint {
    pub balance: i128,
    pub timestamp: u64,
}

fn checkpoint_key(account: &Account, index: u32) -> (Symbol, Account, u32) {
    (CHECKPOINT, account.clone(), index)
}

/// Store checkpoint number `index` of `account`'s history.
///
/// The caller owns the history length (see [`ledger::AccountState`]) and must
/// only ever pass the next free index.
pub(crate) fn write(env: &Env, account: &Account, index: u32, checkpoint: &Checkpoint) {
    let key = checkpoint_key(account, index);
    env.storage().persistent().set(&key, checkpoint);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub(crate) fn read(env: &Env, account: &Account, index: u32) -> Option<Checkpoint> {
    let key = checkpoint_key(account, index);
    let checkpoint: Option<Checkpoint> = env.storage().persistent().get(&key);
    if checkpoint.is_some() {
        env.storage()
            .persistent()
            .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    checkpoint
}

/// Number of checkpoints with `timestamp <= at`.
///
/// Because timestamps are non-decreasing this is an upper bound search: the
/// checkpoint in effect at `at` is the one just before the returned position,
/// and among several checkpoints sharing a timestamp it is the last appended.
fn upper_bound(env: &Env, account: &Account, len: u32, at: u64) -> Result<u32, ContractError> {
    let mut lo = 0u32;
    let mut hi = len;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let checkpoint = read(env, account, mid).ok_or(ContractError::StorageError)?;
        if checkpoint.timestamp <= at {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Balance of `account` in effect at instant `at` (0 before its first checkpoint).
pub fn balance_at(env: &Env, account: &Account, at: u64) -> Result<i128, ContractError> {
    let len = ledger::load(env, account).checkpoints;
    let position = upper_bound(env, account, len, at)?;
    if position == 0 {
        return Ok(0);
    }
    Ok(read(env, account, position - 1)
        .ok_or(ContractError::StorageError)?
        .balance)
}

/// Balance-seconds accumulated by `account` over `[window_start, window_end)`.
pub fn contribution(
    env: &Env,
    account: &Account,
    window_start: u64,
    window_end: u64,
) -> Result<i128, ContractError> {
    if window_end <= window_start {
        return Ok(0);
    }

    let len = ledger::load(env, account).checkpoints;
    let position = upper_bound(env, account, len, window_start)?;
    let opening = if position == 0 {
        0
    } else {
        read(env, account, position - 1)
            .ok_or(ContractError::StorageError)?
            .balance
    };

    let changes =
        (position..len).map(|i| read(env, account, i).ok_or(ContractError::StorageError));
    accumulate(opening, window_start, window_end, changes)
}

/// Integrate a step function over `[window_start, window_end)`.
///
/// `opening` is the balance in effect at `window_start`; `changes` yields the
/// checkpoints recorded strictly after `window_start`, in order. Iteration stops
/// at the first change at or past `window_end`, so later entries are never read.
pub(crate) fn accumulate<I>(
    opening: i128,
    window_start: u64,
    window_end: u64,
    changes: I,
) -> Result<i128, ContractError>
where
    I: IntoIterator<Item = Result<Checkpoint, ContractError>>,
{
    if window_end <= window_start {
        return Ok(0);
    }

    let mut total: i128 = 0;
    let mut balance = opening;
    let mut cursor = window_start;

    for change in changes {
        let change = change?;
        if change.timestamp >= window_end {
            break;
        }
        // Changes at `cursor` only replace the balance; they span no time.
        total = add_span(total, balance, change.timestamp.saturating_sub(cursor))?;
        cursor = cursor.max(change.timestamp);
        balance = change.balance;
    }

    add_span(total, balance, window_end - cursor)
}

fn add_span(total: i128, balance: i128, seconds: u64) -> Result<i128, ContractError> {
    balance
        .checked_mul(i128::from(seconds))
        .and_then(|span| total.checked_add(span))
        .ok_or(ContractError::ArithmeticOverflow)
}

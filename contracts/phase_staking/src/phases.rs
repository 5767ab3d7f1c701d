use soroban_sdk::{contracttype, symbol_short, Env, Symbol};

use crate::ContractError;

const PHASE_COUNT: Symbol = symbol_short!("PH_CNT");
const PHASE: Symbol = symbol_short!("PHASE");

const TTL_THRESHOLD: u32 = 518_400;
const TTL_EXTEND_TO: u32 = 2_073_600;

/// An accounting window declared by the admin.
///
/// Phases are stored in creation order and never modified. Nothing stops a new
/// phase from starting before the previous one's `duration` has elapsed; each
/// phase is still accounted over its own `[start, start + duration)`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Phase {
    pub index: u32,
    pub start: u64,
    pub duration: u64,
}

impl Phase {
    /// Nominal end of the phase, saturating at the end of time.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.duration)
    }

    /// The part of `[start, end)` that has elapsed at `now`.
    ///
    /// Returns `(start, start)` while the phase has not begun. The window is
    /// frozen once `now` passes the nominal end.
    pub fn effective_window(&self, now: u64) -> (u64, u64) {
        let end = self.end().min(now).max(self.start);
        (self.start, end)
    }
}

fn phase_key(index: u32) -> (Symbol, u32) {
    (PHASE, index)
}

pub fn count(env: &Env) -> u32 {
    env.storage().instance().get(&PHASE_COUNT).unwrap_or(0)
}

/// Append a phase starting now. Authorization is the caller's job.
pub fn append(env: &Env, duration: u64) -> Result<Phase, ContractError> {
    if duration == 0 {
        return Err(ContractError::InvalidDuration);
    }

    let index = count(env);
    let next = index
        .checked_add(1)
        .ok_or(ContractError::ArithmeticOverflow)?;

    let phase = Phase {
        index,
        start: env.ledger().timestamp(),
        duration,
    };

    let key = phase_key(index);
    env.storage().persistent().set(&key, &phase);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    env.storage().instance().set(&PHASE_COUNT, &next);

    Ok(phase)
}

pub fn get(env: &Env, index: u32) -> Result<Phase, ContractError> {
    if index >= count(env) {
        return Err(ContractError::PhaseNotFound);
    }
    let key = phase_key(index);
    let phase: Phase = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(ContractError::StorageError)?;
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    Ok(phase)
}

pub fn latest(env: &Env) -> Result<Option<Phase>, ContractError> {
    match count(env) {
        0 => Ok(None),
        n => get(env, n - 1).map(Some),
    }
}

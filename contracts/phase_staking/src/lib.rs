#![no_std]

pub mod checkpoint;
pub mod events;
pub mod ledger;
pub mod phases;

use soroban_sdk::{
    contract, contractimpl, contracttype, log, symbol_short, token, Address, BytesN, Env, Symbol,
};

use ledger::Account;
use phases::Phase;

// ── Storage key constants ────────────────────────────────────────────────────

const ADMIN: Symbol = symbol_short!("ADMIN");
const PENDING_ADMIN: Symbol = symbol_short!("PEND_ADM");
const INITIALIZED: Symbol = symbol_short!("INIT");
const STAKE_TOKEN: Symbol = symbol_short!("STK_TOK");

const INSTANCE_TTL_THRESHOLD: u32 = 518_400;
const INSTANCE_TTL_EXTEND_TO: u32 = 2_073_600;

// ── Contract errors ──────────────────────────────────────────────────────────

#[soroban_sdk::contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ContractError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidAmount = 4,
    InsufficientBalance = 5,
    TransferFailed = 6,
    InvalidDuration = 7,
    PhaseNotFound = 8,
    ArithmeticOverflow = 9,
    NoPendingAdmin = 10,
    StorageError = 11,
}

// ── Public-facing types (re-exported for test consumers) ─────────────────────

/// Balance-seconds accrued during one phase, returned by `contribution_in_phase`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseContribution {
    pub user: i128,
    pub total: i128,
}

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct PhaseStakingContract;

#[contractimpl]
impl PhaseStakingContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    /// Bootstrap the contract.
    ///
    /// * `admin`       – the only address allowed to start phases and upgrade.
    /// * `stake_token` – SAC address of the token users stake.
    pub fn initialize(
        env: Env,
        admin: Address,
        stake_token: Address,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }

        env.storage().instance().set(&ADMIN, &admin);
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&STAKE_TOKEN, &stake_token);
        Self::extend_instance_ttl(&env);
        // Account states, histories and the phase counter start empty;
        // readers treat absent keys as zero.

        events::publish_initialized(&env, admin, stake_token);

        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────────

    /// Deposit `amount` stake tokens.
    ///
    /// The new balance is checkpointed at the current ledger timestamp for both
    /// the staker and the total, whether or not any phase is running.
    pub fn stake(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        staker.require_auth();

        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        // 1. Pull tokens from the staker into the contract.
        let contract = env.current_contract_address();
        Self::transfer_stake_token(&env, &staker, &contract, amount)?;

        // 2. Increase and checkpoint the user's balance and the total.
        let new_stake = ledger::credit(&env, &Account::User(staker.clone()), amount)?;
        let new_total = ledger::credit(&env, &Account::Total, amount)?;
        Self::extend_instance_ttl(&env);

        events::publish_staked(&env, staker, amount, new_stake, new_total);

        Ok(())
    }

    /// Withdraw `amount` stake tokens back to the staker.
    pub fn unstake(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        staker.require_auth();

        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        // 1. Reduce and checkpoint balances; fails before any write if the
        //    staker holds less than `amount`.
        let new_stake = ledger::debit(&env, &Account::User(staker.clone()), amount)?;
        let new_total = ledger::debit(&env, &Account::Total, amount)?;

        // 2. Return tokens. An error here fails the invocation, which rolls back
        //    the writes above.
        let contract = env.current_contract_address();
        Self::transfer_stake_token(&env, &contract, &staker, amount)?;
        Self::extend_instance_ttl(&env);

        events::publish_unstaked(&env, staker, amount, new_stake, new_total);

        Ok(())
    }

    // ── Phases ──────────────────────────────────────────────────────────────

    /// Open a new accounting phase starting at the current ledger timestamp.
    ///
    /// Any earlier phase keeps its own declared window, even if it has not yet
    /// run for its full duration. Returns the new phase's index.
    pub fn start_phase(env: Env, caller: Address, duration: u64) -> Result<u32, ContractError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        Self::require_admin(&env, &caller)?;

        let phase = phases::append(&env, duration)?;
        Self::extend_instance_ttl(&env);

        log!(&env, "phase started", phase.index, phase.start, phase.duration);
        events::publish_phase_started(&env, phase.index, phase.duration);

        Ok(phase.index)
    }

    // ── View functions ───────────────────────────────────────────────────────

    /// Return the user's current staked balance.
    pub fn get_stake(env: Env, user: Address) -> i128 {
        ledger::balance(&env, &Account::User(user))
    }

    /// Return the sum of all currently staked tokens.
    pub fn get_total_stake(env: Env) -> i128 {
        ledger::balance(&env, &Account::Total)
    }

    /// Return the user's staked balance in effect at `timestamp`.
    pub fn get_stake_at(env: Env, user: Address, timestamp: u64) -> Result<i128, ContractError> {
        checkpoint::balance_at(&env, &Account::User(user), timestamp)
    }

    /// Return the total staked balance in effect at `timestamp`.
    pub fn get_total_stake_at(env: Env, timestamp: u64) -> Result<i128, ContractError> {
        checkpoint::balance_at(&env, &Account::Total, timestamp)
    }

    /// Return how many balance changes have been recorded for `user`.
    pub fn get_checkpoint_count(env: Env, user: Address) -> u32 {
        ledger::load(&env, &Account::User(user)).checkpoints
    }

    /// Return how many phases have been started.
    pub fn phase_count(env: Env) -> u32 {
        phases::count(&env)
    }

    /// Return phase `index`, or `PhaseNotFound` if it was never started.
    pub fn get_phase(env: Env, index: u32) -> Result<Phase, ContractError> {
        phases::get(&env, index)
    }

    /// Return the most recently started phase, if any.
    pub fn get_latest_phase(env: Env) -> Result<Option<Phase>, ContractError> {
        phases::latest(&env)
    }

    /// Balance-seconds accrued by `user` and by all stakers during phase `index`.
    ///
    /// Only the elapsed part of the phase counts, so the result keeps growing
    /// until the phase's duration has passed and is fixed from then on.
    pub fn contribution_in_phase(
        env: Env,
        user: Address,
        index: u32,
    ) -> Result<PhaseContribution, ContractError> {
        let phase = phases::get(&env, index)?;
        let (start, end) = phase.effective_window(env.ledger().timestamp());

        Ok(PhaseContribution {
            user: checkpoint::contribution(&env, &Account::User(user), start, end)?,
            total: checkpoint::contribution(&env, &Account::Total, start, end)?,
        })
    }

    pub fn get_stake_token(env: Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&STAKE_TOKEN)
            .ok_or(ContractError::NotInitialized)
    }

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    pub fn get_admin(env: Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&ADMIN)
            .ok_or(ContractError::NotInitialized)
    }

    // ── Admin transfer (two-step) ──────────────────────────────────────────

    /// Propose a new admin address. Only the current admin can call this.
    /// The new admin must call `accept_admin` to complete the transfer.
    pub fn propose_admin(
        env: Env,
        current_admin: Address,
        new_admin: Address,
    ) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        current_admin.require_auth();
        Self::require_admin(&env, &current_admin)?;

        env.storage().instance().set(&PENDING_ADMIN, &new_admin);

        events::publish_admin_transfer_proposed(&env, current_admin, new_admin);

        Ok(())
    }

    /// Accept the pending admin transfer. Only the proposed new admin can call this.
    pub fn accept_admin(env: Env, new_admin: Address) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        new_admin.require_auth();

        let pending: Address = env
            .storage()
            .instance()
            .get(&PENDING_ADMIN)
            .ok_or(ContractError::NoPendingAdmin)?;

        if new_admin != pending {
            return Err(ContractError::Unauthorized);
        }

        let old_admin: Address = env
            .storage()
            .instance()
            .get(&ADMIN)
            .ok_or(ContractError::NotInitialized)?;

        env.storage().instance().set(&ADMIN, &new_admin);
        env.storage().instance().remove(&PENDING_ADMIN);

        log!(&env, "admin transferred", old_admin.clone(), new_admin.clone());
        events::publish_admin_transfer_accepted(&env, old_admin, new_admin);

        Ok(())
    }

    /// Cancel a pending admin transfer. Only the current admin can call this.
    pub fn cancel_admin_transfer(env: Env, current_admin: Address) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        current_admin.require_auth();
        Self::require_admin(&env, &current_admin)?;

        let pending: Address = env
            .storage()
            .instance()
            .get(&PENDING_ADMIN)
            .ok_or(ContractError::NoPendingAdmin)?;

        env.storage().instance().remove(&PENDING_ADMIN);

        events::publish_admin_transfer_cancelled(&env, current_admin, pending);

        Ok(())
    }

    /// Get the pending admin address, if any.
    pub fn get_pending_admin(env: Env) -> Option<Address> {
        env.storage().instance().get(&PENDING_ADMIN)
    }

    // ── Upgrade ──────────────────────────────────────────────────────────────

    /// Replace the contract code with the uploaded Wasm `new_wasm_hash`.
    ///
    /// Storage is untouched: balances, histories and phases carry over.
    pub fn upgrade(
        env: Env,
        caller: Address,
        new_wasm_hash: BytesN<32>,
    ) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        Self::require_admin(&env, &caller)?;

        env.deployer()
            .update_current_contract_wasm(new_wasm_hash.clone());

        log!(&env, "contract upgraded", new_wasm_hash.clone());
        events::publish_upgraded(&env, caller, new_wasm_hash);

        Ok(())
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Guard: revert if the contract is not yet initialized.
    fn require_initialized(env: &Env) -> Result<(), ContractError> {
        if !env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::NotInitialized);
        }
        Ok(())
    }

    /// Guard: revert if `caller` is not the stored admin.
    fn require_admin(env: &Env, caller: &Address) -> Result<(), ContractError> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&ADMIN)
            .ok_or(ContractError::NotInitialized)?;
        if *caller != admin {
            return Err(ContractError::Unauthorized);
        }
        Ok(())
    }

    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
    }

    /// Move stake tokens, mapping any token-side failure to `TransferFailed`.
    fn transfer_stake_token(
        env: &Env,
        from: &Address,
        to: &Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        let stake_token: Address = env
            .storage()
            .instance()
            .get(&STAKE_TOKEN)
            .ok_or(ContractError::NotInitialized)?;
        match token::Client::new(env, &stake_token).try_transfer(from, to, &amount) {
            Ok(Ok(())) => Ok(()),
            _ => Err(ContractError::TransferFailed),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod test_contribution;

//! In-memory execution environment.
//!
//! Holds smart accounts, token ledgers, native balances and the clock.
//! Checkpoints are full state snapshots on a stack, which is enough for the
//! all-or-nothing semantics of a redemption batch and for `try` calls.

use super::account::{AccountValidator, SmartAccount};
use super::token::TokenLedger;
use crate::codec::{decode_executions, Erc20Call, ExecType, Execution, ExecutionMode};
use crate::hash::u128_word;
use crate::host::{CallerContext, Checkpoint, Host, HostView, Revert};
use crate::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A call skipped under the `try` exec type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCall {
    pub account: Address,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
struct WorldState {
    now: u64,
    accounts: BTreeMap<Address, SmartAccount>,
    tokens: BTreeMap<Address, TokenLedger>,
    native: BTreeMap<Address, u128>,
    failed_calls: Vec<FailedCall>,
}

#[derive(Debug, Default)]
pub struct World {
    state: WorldState,
    checkpoints: Vec<WorldState>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, now: u64) -> Self {
        self.state.now = now;
        self
    }

    pub fn set_timestamp(&mut self, now: u64) {
        self.state.now = now;
    }

    // ── accounts ──────────────────────────────────────────────────────

    pub fn account_address(label: &str) -> Address {
        Address::derive(&format!("caveat.account.{label}"))
    }

    pub fn deploy_account(&mut self, address: Address, validator: AccountValidator) {
        debug!(account = %address, validator = validator.kind(), "account deployed");
        self.state
            .accounts
            .insert(address, SmartAccount::new(validator));
    }

    /// Deploy at the address derived from `label`.
    pub fn deploy_named_account(&mut self, label: &str, validator: AccountValidator) -> Address {
        let address = Self::account_address(label);
        self.deploy_account(address, validator);
        address
    }

    pub fn account(&self, address: &Address) -> Option<&SmartAccount> {
        self.state.accounts.get(address)
    }

    /// Switch an account to a new validator, clearing the old one first.
    pub fn migrate_account(
        &mut self,
        context: CallerContext,
        address: &Address,
        validator: AccountValidator,
    ) -> Result<Option<AccountValidator>, Revert> {
        let account = self
            .state
            .accounts
            .get_mut(address)
            .ok_or_else(|| Revert::with_reason("account: not deployed"))?;
        account.check_admin(context)?;
        Ok(account.migrate(validator))
    }

    /// Reconfigure an account's validator in place.
    pub fn configure_account<T>(
        &mut self,
        context: CallerContext,
        address: &Address,
        f: impl FnOnce(&mut AccountValidator) -> T,
    ) -> Result<T, Revert> {
        let account = self
            .state
            .accounts
            .get_mut(address)
            .ok_or_else(|| Revert::with_reason("account: not deployed"))?;
        account.check_admin(context)?;
        let validator = account
            .validator_mut()
            .ok_or_else(|| Revert::with_reason("account: no validator installed"))?;
        Ok(f(validator))
    }

    // ── tokens and balances ───────────────────────────────────────────

    pub fn token_address(symbol: &str) -> Address {
        Address::derive(&format!("caveat.token.{symbol}"))
    }

    pub fn deploy_token(&mut self, symbol: &str) -> Address {
        let address = Self::token_address(symbol);
        self.state
            .tokens
            .entry(address)
            .or_insert_with(|| TokenLedger::new(symbol));
        address
    }

    pub fn token(&self, address: &Address) -> Option<&TokenLedger> {
        self.state.tokens.get(address)
    }

    pub fn mint(&mut self, token: &Address, to: Address, amount: u128) -> Result<(), Revert> {
        self.state
            .tokens
            .get_mut(token)
            .ok_or_else(|| Revert::with_reason("token: not deployed"))?
            .mint(to, amount)
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> u128 {
        self.token(token)
            .map(|t| t.allowance(owner, spender))
            .unwrap_or(0)
    }

    pub fn set_native_balance(&mut self, account: Address, amount: u128) {
        self.state.native.insert(account, amount);
    }

    pub fn failed_calls(&self) -> &[FailedCall] {
        &self.state.failed_calls
    }

    // ── execution ─────────────────────────────────────────────────────

    /// Direct execution by the entry point or the account itself.
    pub fn execute(
        &mut self,
        context: CallerContext,
        account: &Address,
        mode: ExecutionMode,
        payload: &[u8],
    ) -> Result<Vec<Vec<u8>>, Revert> {
        self.deployed(account)?.check_execute(context)?;
        self.run_executions(account, mode, payload)
    }

    fn deployed(&self, account: &Address) -> Result<&SmartAccount, Revert> {
        self.state
            .accounts
            .get(account)
            .ok_or_else(|| Revert::with_reason("account: not a smart account"))
    }

    fn run_executions(
        &mut self,
        account: &Address,
        mode: ExecutionMode,
        payload: &[u8],
    ) -> Result<Vec<Vec<u8>>, Revert> {
        let calls = decode_executions(mode, payload)
            .map_err(|e| Revert::with_reason(format!("account: {e}")))?;

        let mut results = Vec::with_capacity(calls.len());
        for (index, call) in calls.iter().enumerate() {
            match mode.exec_type {
                ExecType::Default => results.push(self.call(account, call)?),
                ExecType::Try => {
                    let before = self.state.clone();
                    match self.call(account, call) {
                        Ok(data) => results.push(data),
                        Err(revert) => {
                            self.state = before;
                            warn!(account = %account, index, reason = %revert, "try call failed");
                            self.state.failed_calls.push(FailedCall {
                                account: *account,
                                index,
                                reason: revert.to_string(),
                            });
                            results.push(Vec::new());
                        }
                    }
                }
            }
        }
        Ok(results)
    }

    fn call(&mut self, from: &Address, call: &Execution) -> Result<Vec<u8>, Revert> {
        if let Some(token) = self.state.tokens.get_mut(&call.target) {
            if call.value != 0 {
                return Err(Revert::with_reason("token: not payable"));
            }
            let parsed = Erc20Call::decode(&call.call_data).map_err(|_| Revert::without_reason())?;
            return match parsed {
                Erc20Call::Approve { spender, amount } => {
                    token.approve(*from, spender, amount);
                    Ok(u128_word(1).to_vec())
                }
                Erc20Call::Transfer { to, amount } => {
                    token.transfer(*from, to, amount)?;
                    Ok(u128_word(1).to_vec())
                }
                Erc20Call::TransferFrom {
                    from: owner,
                    to,
                    amount,
                } => {
                    token.transfer_from(*from, owner, to, amount)?;
                    Ok(u128_word(1).to_vec())
                }
                Erc20Call::BalanceOf { owner } => Ok(u128_word(token.balance_of(&owner)).to_vec()),
            };
        }

        if !call.call_data.is_empty() {
            return Err(Revert::without_reason());
        }

        if call.value != 0 {
            let balance = self.native_balance(from);
            let remaining = balance
                .checked_sub(call.value)
                .ok_or_else(|| Revert::with_reason("native: insufficient balance"))?;
            self.state.native.insert(*from, remaining);
            let to_balance = self.native_balance(&call.target).saturating_add(call.value);
            self.state.native.insert(call.target, to_balance);
        }
        Ok(Vec::new())
    }
}

impl HostView for World {
    fn is_contract(&self, account: &Address) -> bool {
        self.state.accounts.contains_key(account)
    }

    fn is_valid_signature(
        &self,
        account: &Address,
        digest: &H256,
        signature: &[u8],
    ) -> Result<[u8; 4], Revert> {
        self.deployed(account)?.is_valid_signature(digest, signature)
    }

    fn timestamp(&self) -> u64 {
        self.state.now
    }

    fn token_balance(&self, token: &Address, account: &Address) -> u128 {
        self.token(token).map(|t| t.balance_of(account)).unwrap_or(0)
    }

    fn native_balance(&self, account: &Address) -> u128 {
        self.state.native.get(account).copied().unwrap_or(0)
    }
}

impl Host for World {
    fn execute_from_executor(
        &mut self,
        context: CallerContext,
        account: &Address,
        mode: ExecutionMode,
        payload: &[u8],
    ) -> Result<Vec<Vec<u8>>, Revert> {
        self.deployed(account)?.check_executor(context)?;
        self.run_executions(account, mode, payload)
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.checkpoints.push(self.state.clone());
        Checkpoint::new(self.checkpoints.len() - 1)
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.truncate(checkpoint.depth());
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.truncate(checkpoint.depth() + 1);
        if let Some(saved) = self.checkpoints.pop() {
            self.state = saved;
        }
    }
}

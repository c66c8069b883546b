//! Boundary to the execution environment.
//!
//! The engine never touches account state directly. It reads through
//! [`HostView`] (contract detection, signature callouts, time, balances) and
//! drives effects through [`Host`] (executing on an account's behalf and
//! checkpointing so that a failed redemption leaves no trace).

use crate::codec::ExecutionMode;
use crate::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure reported by the host or a callee.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Revert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Revert {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    pub fn without_reason() -> Self {
        Self { reason: None }
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => f.write_str(reason),
            None => f.write_str("failed without reason"),
        }
    }
}

impl std::error::Error for Revert {}

/// Who is calling an account entry point.
///
/// Accounts check this explicitly per operation instead of relying on
/// inherited modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerContext {
    /// The account-abstraction entry point relaying a user operation.
    EntryPoint,
    /// The account calling itself.
    SelfCall,
    /// A delegation manager redeeming on the account's behalf.
    DelegationManager,
    /// The account's owner key acting directly.
    Owner,
}

/// Opaque handle returned by [`Host::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Checkpoint {
    pub fn new(depth: usize) -> Self {
        Self(depth)
    }

    pub fn depth(&self) -> usize {
        self.0
    }
}

/// Read-only view of the environment.
pub trait HostView {
    /// Whether `account` is a smart account (has code) rather than a plain key holder.
    fn is_contract(&self, account: &Address) -> bool;

    /// Contract-signature callout. Returns the account's 4-byte answer.
    fn is_valid_signature(
        &self,
        account: &Address,
        digest: &H256,
        signature: &[u8],
    ) -> Result<[u8; 4], Revert>;

    /// Current time in seconds.
    fn timestamp(&self) -> u64;

    /// Token balance of `account`.
    fn token_balance(&self, token: &Address, account: &Address) -> u128;

    fn native_balance(&self, account: &Address) -> u128;
}

/// Mutable environment with all-or-nothing checkpoints.
pub trait Host: HostView {
    /// Run `payload` through `account`'s execution capability.
    ///
    /// Returns one return-data entry per executed call.
    fn execute_from_executor(
        &mut self,
        context: CallerContext,
        account: &Address,
        mode: ExecutionMode,
        payload: &[u8],
    ) -> Result<Vec<Vec<u8>>, Revert>;

    fn checkpoint(&mut self) -> Checkpoint;

    /// Keep every effect since `checkpoint`.
    fn commit(&mut self, checkpoint: Checkpoint);

    /// Discard every effect since `checkpoint`.
    fn revert_to(&mut self, checkpoint: Checkpoint);
}

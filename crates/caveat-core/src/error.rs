//! Error types for the delegation engine.
//!
//! Every failure aborts the whole redemption. [`ErrorClass`] groups failures
//! into the categories a caller needs to decide what to fix before
//! resubmitting.

use crate::codec::CodecError;
use crate::enforcer::{EnforcerError, HookKind};
use crate::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    MalformedInput,
    Authorization,
    Policy,
    Execution,
    StateConflict,
}

impl ErrorClass {
    /// Stable CLI exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MalformedInput => 10,
            Self::Authorization => 11,
            Self::Policy => 12,
            Self::Execution => 13,
            Self::StateConflict => 14,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed_input",
            Self::Authorization => "authorization",
            Self::Policy => "policy",
            Self::Execution => "execution",
            Self::StateConflict => "state_conflict",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelegationError {
    #[error("redemption is paused")]
    Paused,

    #[error("batch length mismatch: {contexts} contexts, {modes} modes, {payloads} payloads")]
    BatchLengthMismatch {
        contexts: usize,
        modes: usize,
        payloads: usize,
    },

    #[error("empty redemption batch")]
    EmptyBatch,

    #[error("malformed permission context at batch index {index}: {source}")]
    MalformedContext { index: usize, source: CodecError },

    #[error("malformed execution payload at batch index {index}: {source}")]
    MalformedExecution { index: usize, source: CodecError },

    #[error("invalid delegate at chain index {index}: expected {expected}, got {got}")]
    InvalidDelegate {
        index: usize,
        expected: Address,
        got: Address,
    },

    #[error("empty signature on delegation {hash}")]
    EmptySignature { hash: H256 },

    #[error("invalid key signature for delegator {delegator} on delegation {hash}")]
    InvalidKeySignature { delegator: Address, hash: H256 },

    #[error("invalid contract signature for delegator {delegator} on delegation {hash}")]
    InvalidContractSignature { delegator: Address, hash: H256 },

    #[error("signature callout to {delegator} reverted: {reason}")]
    SignatureCalloutReverted { delegator: Address, reason: String },

    #[error("invalid authority at chain index {index}: expected {expected}, got {got}")]
    InvalidAuthority {
        index: usize,
        expected: H256,
        got: H256,
    },

    #[error("cannot use a disabled delegation: {hash}")]
    DisabledDelegation { hash: H256 },

    #[error("caller {caller} is not the delegator {delegator}")]
    NotDelegator { caller: Address, delegator: Address },

    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("caller {caller} is not the pending owner")]
    NotPendingOwner { caller: Address },

    #[error("unknown enforcer: {enforcer}")]
    UnknownEnforcer { enforcer: Address },

    #[error("caveat {enforcer} rejected in {hook} for delegation {delegation}: {source}")]
    Caveat {
        enforcer: Address,
        hook: HookKind,
        delegation: H256,
        source: EnforcerError,
    },

    #[error("execution on {account} failed: {reason}")]
    ExecutionFailed { account: Address, reason: String },

    #[error("delegation already disabled: {hash}")]
    AlreadyDisabled { hash: H256 },

    #[error("delegation already enabled: {hash}")]
    AlreadyEnabled { hash: H256 },

    #[error("delegation already registered: {hash}")]
    AlreadyRegistered { hash: H256 },

    #[error("pre-registered delegations are not enabled")]
    PreregistrationDisabled,

    #[error("redemption is already paused")]
    AlreadyPaused,

    #[error("redemption is not paused")]
    NotPaused,
}

impl DelegationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BatchLengthMismatch { .. }
            | Self::EmptyBatch
            | Self::MalformedContext { .. }
            | Self::MalformedExecution { .. }
            | Self::UnknownEnforcer { .. } => ErrorClass::MalformedInput,

            Self::InvalidDelegate { .. }
            | Self::EmptySignature { .. }
            | Self::InvalidKeySignature { .. }
            | Self::InvalidContractSignature { .. }
            | Self::SignatureCalloutReverted { .. }
            | Self::InvalidAuthority { .. }
            | Self::DisabledDelegation { .. }
            | Self::NotDelegator { .. }
            | Self::NotOwner { .. }
            | Self::NotPendingOwner { .. } => ErrorClass::Authorization,

            Self::Caveat { source, .. } => source.class(),

            Self::ExecutionFailed { .. } => ErrorClass::Execution,

            Self::Paused
            | Self::AlreadyDisabled { .. }
            | Self::AlreadyEnabled { .. }
            | Self::AlreadyRegistered { .. }
            | Self::PreregistrationDisabled
            | Self::AlreadyPaused
            | Self::NotPaused => ErrorClass::StateConflict,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.class().exit_code()
    }
}

pub type DelegationResult<T> = Result<T, DelegationError>;

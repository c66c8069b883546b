//! Caveat enforcer protocol.
//!
//! An enforcer is a policy module addressed by an [`Address`]. The manager
//! resolves it through the [`EnforcerRegistry`] at call time and invokes its
//! hooks in this order for every redemption batch:
//!
//! ```text
//! beforeAll   every chain in batch order, leaf → root, caveats in order
//! before      per chain, leaf → root, caveats in order
//! (execute)
//! after       per chain, root → leaf, caveats reversed
//! afterAll    every chain in batch order, root → leaf, caveats reversed
//! ```
//!
//! Returning an error from any hook aborts the whole batch. Only `after` and
//! `afterAll` may rely on the action having executed.

mod registry;
mod storage;

pub use registry::EnforcerRegistry;
pub use storage::{EnforcerStorage, EnforcerStore};

use crate::codec::ExecutionMode;
use crate::error::ErrorClass;
use crate::host::HostView;
use crate::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    BeforeAll,
    Before,
    After,
    AfterAll,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeAll => "beforeAll",
            Self::Before => "before",
            Self::After => "after",
            Self::AfterAll => "afterAll",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnforcerError {
    #[error("invalid terms: {reason}")]
    InvalidTerms { reason: String },

    #[error("{reason}")]
    Rejected { reason: String },

    #[error("enforcer lock already held")]
    Locked,
}

impl EnforcerError {
    pub fn invalid_terms(reason: impl Into<String>) -> Self {
        Self::InvalidTerms {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidTerms { .. } => ErrorClass::MalformedInput,
            Self::Rejected { .. } => ErrorClass::Policy,
            Self::Locked => ErrorClass::StateConflict,
        }
    }
}

pub type HookResult = Result<(), EnforcerError>;

/// Inputs every hook receives.
#[derive(Debug, Clone, Copy)]
pub struct HookArgs<'a> {
    pub terms: &'a [u8],
    pub args: &'a [u8],
    pub mode: ExecutionMode,
    pub execution_calldata: &'a [u8],
    pub delegation_hash: H256,
    pub delegator: Address,
    pub redeemer: Address,
}

/// Environment for one hook call.
pub struct HookEnv<'a> {
    /// Address of the manager invoking the hook.
    pub caller: Address,
    pub host: &'a dyn HostView,
    /// Storage private to the enforcer being called.
    pub storage: EnforcerStore<'a>,
}

/// A pluggable policy module. Every hook defaults to "continue".
pub trait CaveatEnforcer: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    fn before_all_hook(&self, _hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        Ok(())
    }

    fn before_hook(&self, _hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        Ok(())
    }

    fn after_hook(&self, _hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        Ok(())
    }

    fn after_all_hook(&self, _hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        Ok(())
    }

    /// Dispatch by kind.
    fn call_hook(&self, kind: HookKind, hook: &HookArgs<'_>, env: &mut HookEnv<'_>) -> HookResult {
        match kind {
            HookKind::BeforeAll => self.before_all_hook(hook, env),
            HookKind::Before => self.before_hook(hook, env),
            HookKind::After => self.after_hook(hook, env),
            HookKind::AfterAll => self.after_all_hook(hook, env),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            EnforcerError::invalid_terms("short").class(),
            ErrorClass::MalformedInput
        );
        assert_eq!(EnforcerError::rejected("no").class(), ErrorClass::Policy);
        assert_eq!(EnforcerError::Locked.class(), ErrorClass::StateConflict);
    }

    #[test]
    fn test_rejection_keeps_enforcer_reason() {
        assert_eq!(
            EnforcerError::rejected("ValueLteEnforcer:value-too-high").to_string(),
            "ValueLteEnforcer:value-too-high"
        );
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(HookKind::BeforeAll.to_string(), "beforeAll");
        assert_eq!(HookKind::AfterAll.to_string(), "afterAll");
    }
}

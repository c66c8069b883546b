//! Reference enforcer catalog.
//!
//! Each enforcer lives at a deterministic address derived from its label, so
//! delegations built offline can reference it without a deployment step.

mod allowed_methods;
mod allowed_targets;
mod approval_amount;
mod erc20_balance_change;
mod erc20_transfer_amount;
mod limited_calls;
mod redeemer;
mod timestamp;
mod value_lte;

pub use allowed_methods::AllowedMethodsEnforcer;
pub use allowed_targets::AllowedTargetsEnforcer;
pub use approval_amount::ApprovalAmountEnforcer;
pub use erc20_balance_change::{BalanceDirection, Erc20BalanceChangeEnforcer};
pub use erc20_transfer_amount::Erc20TransferAmountEnforcer;
pub use limited_calls::LimitedCallsEnforcer;
pub use redeemer::RedeemerEnforcer;
pub use timestamp::TimestampEnforcer;
pub use value_lte::ValueLteEnforcer;

use crate::codec::{decode_executions, u128_from_word, CallType, ExecType, Execution};
use crate::enforcer::{EnforcerError, EnforcerRegistry, HookArgs};
use crate::hash::hash_concat;
use crate::types::{Address, H256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcerKind {
    AllowedTargets,
    AllowedMethods,
    ValueLte,
    Timestamp,
    LimitedCalls,
    Redeemer,
    ApprovalAmount,
    Erc20TransferAmount,
    Erc20BalanceChange,
}

impl EnforcerKind {
    pub const ALL: [EnforcerKind; 9] = [
        Self::AllowedTargets,
        Self::AllowedMethods,
        Self::ValueLte,
        Self::Timestamp,
        Self::LimitedCalls,
        Self::Redeemer,
        Self::ApprovalAmount,
        Self::Erc20TransferAmount,
        Self::Erc20BalanceChange,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::AllowedTargets => "allowed-targets",
            Self::AllowedMethods => "allowed-methods",
            Self::ValueLte => "value-lte",
            Self::Timestamp => "timestamp",
            Self::LimitedCalls => "limited-calls",
            Self::Redeemer => "redeemer",
            Self::ApprovalAmount => "approval-amount",
            Self::Erc20TransferAmount => "erc20-transfer-amount",
            Self::Erc20BalanceChange => "erc20-balance-change",
        }
    }

    pub fn address(&self) -> Address {
        Address::derive(&format!("caveat.enforcer.{}", self.label()))
    }

    pub fn from_address(address: &Address) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.address() == *address)
    }
}

/// Install every catalog enforcer at its address.
pub fn register_catalog(registry: &mut EnforcerRegistry) {
    for kind in EnforcerKind::ALL {
        let enforcer: Arc<dyn crate::enforcer::CaveatEnforcer> = match kind {
            EnforcerKind::AllowedTargets => Arc::new(AllowedTargetsEnforcer),
            EnforcerKind::AllowedMethods => Arc::new(AllowedMethodsEnforcer),
            EnforcerKind::ValueLte => Arc::new(ValueLteEnforcer),
            EnforcerKind::Timestamp => Arc::new(TimestampEnforcer),
            EnforcerKind::LimitedCalls => Arc::new(LimitedCallsEnforcer),
            EnforcerKind::Redeemer => Arc::new(RedeemerEnforcer),
            EnforcerKind::ApprovalAmount => Arc::new(ApprovalAmountEnforcer),
            EnforcerKind::Erc20TransferAmount => Arc::new(Erc20TransferAmountEnforcer),
            EnforcerKind::Erc20BalanceChange => Arc::new(Erc20BalanceChangeEnforcer),
        };
        registry.register(kind.address(), enforcer);
    }
}

/// Decode every call of the action. Only the `default` exec type is accepted.
pub(crate) fn executions(hook: &HookArgs<'_>, name: &str) -> Result<Vec<Execution>, EnforcerError> {
    if hook.mode.exec_type != ExecType::Default {
        return Err(EnforcerError::rejected(format!("{name}:invalid-execution-type")));
    }
    decode_executions(hook.mode, hook.execution_calldata)
        .map_err(|e| EnforcerError::rejected(format!("{name}:invalid-execution: {e}")))
}

/// Decode a single/default action.
pub(crate) fn single_execution(hook: &HookArgs<'_>, name: &str) -> Result<Execution, EnforcerError> {
    if hook.mode.call_type != CallType::Single {
        return Err(EnforcerError::rejected(format!("{name}:invalid-call-type")));
    }
    let mut calls = executions(hook, name)?;
    calls
        .pop()
        .ok_or_else(|| EnforcerError::rejected(format!("{name}:invalid-execution")))
}

pub(crate) fn address_list(terms: &[u8], name: &str) -> Result<Vec<Address>, EnforcerError> {
    if terms.is_empty() || terms.len() % Address::LEN != 0 {
        return Err(EnforcerError::invalid_terms(format!(
            "{name}:invalid-terms-length"
        )));
    }
    Ok(terms
        .chunks_exact(Address::LEN)
        .filter_map(Address::from_slice)
        .collect())
}

pub(crate) fn word_terms(terms: &[u8], name: &str) -> Result<u128, EnforcerError> {
    if terms.len() != 32 {
        return Err(EnforcerError::invalid_terms(format!(
            "{name}:invalid-terms-length"
        )));
    }
    u128_from_word(terms).map_err(|e| EnforcerError::invalid_terms(format!("{name}: {e}")))
}

/// `token(20) ‖ amount(32)`.
pub(crate) fn token_amount_terms(terms: &[u8], name: &str) -> Result<(Address, u128), EnforcerError> {
    if terms.len() != 52 {
        return Err(EnforcerError::invalid_terms(format!(
            "{name}:invalid-terms-length"
        )));
    }
    let token = Address::from_slice(&terms[..20])
        .ok_or_else(|| EnforcerError::invalid_terms(format!("{name}:invalid-terms-length")))?;
    Ok((token, word_terms(&terms[20..], name)?))
}

pub(crate) fn encode_token_amount(token: &Address, amount: u128) -> Vec<u8> {
    let mut out = Vec::with_capacity(52);
    out.extend_from_slice(token.as_bytes());
    out.extend_from_slice(&crate::hash::u128_word(amount));
    out
}

/// Storage key for state tracked per (manager, delegation).
pub(crate) fn delegation_key(caller: &Address, delegation_hash: &H256) -> H256 {
    hash_concat(&[caller.as_ref(), delegation_hash.as_ref()])
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::codec::{encode_single, Execution, ExecutionMode};
    use crate::enforcer::{EnforcerStorage, HookArgs, HookEnv};
    use crate::host::{HostView, Revert};
    use crate::types::{Address, H256};
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct TestHost {
        pub now: u64,
        pub balances: HashMap<(Address, Address), u128>,
    }

    impl HostView for TestHost {
        fn is_contract(&self, _account: &Address) -> bool {
            false
        }

        fn is_valid_signature(
            &self,
            _account: &Address,
            _digest: &H256,
            _signature: &[u8],
        ) -> Result<[u8; 4], Revert> {
            Err(Revert::without_reason())
        }

        fn timestamp(&self) -> u64 {
            self.now
        }

        fn token_balance(&self, token: &Address, account: &Address) -> u128 {
            self.balances.get(&(*token, *account)).copied().unwrap_or(0)
        }

        fn native_balance(&self, _account: &Address) -> u128 {
            0
        }
    }

    pub fn manager() -> Address {
        Address::derive("manager")
    }

    pub fn args<'a>(terms: &'a [u8], payload: &'a [u8], mode: ExecutionMode) -> HookArgs<'a> {
        HookArgs {
            terms,
            args: &[],
            mode,
            execution_calldata: payload,
            delegation_hash: H256([7; 32]),
            delegator: Address::derive("delegator"),
            redeemer: Address::derive("redeemer"),
        }
    }

    pub fn single(target: Address, value: u128, call_data: Vec<u8>) -> Vec<u8> {
        encode_single(&Execution::new(target, value, call_data))
    }

    pub fn env<'a>(
        host: &'a TestHost,
        storage: &'a mut EnforcerStorage,
        enforcer: Address,
    ) -> HookEnv<'a> {
        HookEnv {
            caller: manager(),
            host,
            storage: storage.scoped(enforcer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_distinct_and_resolvable() {
        for kind in EnforcerKind::ALL {
            assert_eq!(EnforcerKind::from_address(&kind.address()), Some(kind));
        }
        let mut seen = std::collections::BTreeSet::new();
        for kind in EnforcerKind::ALL {
            assert!(seen.insert(kind.address()));
        }
    }

    #[test]
    fn test_catalog_registers_all() {
        let registry = EnforcerRegistry::with_catalog();
        assert_eq!(registry.len(), EnforcerKind::ALL.len());
        for kind in EnforcerKind::ALL {
            assert!(registry.contains(&kind.address()));
        }
    }

    #[test]
    fn test_address_list_rejects_partial() {
        assert!(address_list(&[0u8; 21], "X").is_err());
        assert!(address_list(&[], "X").is_err());
        assert_eq!(address_list(&[1u8; 40], "X").unwrap().len(), 2);
    }
}

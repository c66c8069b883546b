use super::{delegation_key, word_terms, EnforcerKind};
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::hash::u128_word;
use crate::types::Caveat;
use tracing::debug;

const NAME: &str = "LimitedCallsEnforcer";

/// Caps how many times a delegation can be redeemed.
///
/// Terms: `limit(32)`. The counter is kept per (manager, delegation).
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitedCallsEnforcer;

impl LimitedCallsEnforcer {
    pub fn terms(limit: u128) -> Vec<u8> {
        u128_word(limit).to_vec()
    }

    pub fn caveat(limit: u128) -> Caveat {
        Caveat::new(EnforcerKind::LimitedCalls.address(), Self::terms(limit))
    }
}

impl CaveatEnforcer for LimitedCallsEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, env: &mut HookEnv<'_>) -> HookResult {
        let limit = word_terms(hook.terms, NAME)?;
        let key = delegation_key(&env.caller, &hook.delegation_hash);
        let count = env.storage.get_u128(&key).saturating_add(1);
        if count > limit {
            return Err(EnforcerError::rejected(format!("{NAME}:limit-exceeded")));
        }
        env.storage.set_u128(key, count);
        debug!(delegation = %hook.delegation_hash, count, limit, "call counted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ExecutionMode;
    use crate::enforcer::EnforcerStorage;
    use crate::enforcers::testing::{args, env, single, TestHost};
    use crate::types::{Address, H256};

    #[test]
    fn test_limit() {
        let terms = LimitedCallsEnforcer::terms(2);
        let payload = single(Address::derive("to"), 0, vec![]);
        let host = TestHost::default();
        let mut storage = EnforcerStorage::new();
        let hook = args(&terms, &payload, ExecutionMode::SINGLE_DEFAULT);

        for _ in 0..2 {
            let mut env = env(&host, &mut storage, EnforcerKind::LimitedCalls.address());
            LimitedCallsEnforcer.before_hook(&hook, &mut env).unwrap();
        }
        let mut env = env(&host, &mut storage, EnforcerKind::LimitedCalls.address());
        assert_eq!(
            LimitedCallsEnforcer.before_hook(&hook, &mut env),
            Err(EnforcerError::rejected("LimitedCallsEnforcer:limit-exceeded"))
        );
    }

    #[test]
    fn test_counter_per_delegation() {
        let terms = LimitedCallsEnforcer::terms(1);
        let payload = single(Address::derive("to"), 0, vec![]);
        let host = TestHost::default();
        let mut storage = EnforcerStorage::new();

        let first = args(&terms, &payload, ExecutionMode::SINGLE_DEFAULT);
        let second = HookArgs {
            delegation_hash: H256([8; 32]),
            ..first
        };
        for hook in [first, second] {
            let mut env = env(&host, &mut storage, EnforcerKind::LimitedCalls.address());
            LimitedCallsEnforcer.before_hook(&hook, &mut env).unwrap();
        }
    }
}

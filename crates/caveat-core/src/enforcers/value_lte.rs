use super::{executions, word_terms, EnforcerKind};
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::hash::u128_word;
use crate::types::Caveat;

const NAME: &str = "ValueLteEnforcer";

/// Caps the native value attached to each call.
///
/// Terms: `max(32)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueLteEnforcer;

impl ValueLteEnforcer {
    pub fn terms(max: u128) -> Vec<u8> {
        u128_word(max).to_vec()
    }

    pub fn caveat(max: u128) -> Caveat {
        Caveat::new(EnforcerKind::ValueLte.address(), Self::terms(max))
    }
}

impl CaveatEnforcer for ValueLteEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        let max = word_terms(hook.terms, NAME)?;
        if executions(hook, NAME)?.iter().any(|call| call.value > max) {
            return Err(EnforcerError::rejected(format!("{NAME}:value-too-high")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ExecutionMode;
    use crate::enforcer::EnforcerStorage;
    use crate::enforcers::testing::{args, env, single, TestHost};
    use crate::types::Address;

    fn run(max: u128, value: u128) -> HookResult {
        let terms = ValueLteEnforcer::terms(max);
        let payload = single(Address::derive("to"), value, vec![]);
        let host = TestHost::default();
        let mut storage = EnforcerStorage::new();
        let mut env = env(&host, &mut storage, EnforcerKind::ValueLte.address());
        ValueLteEnforcer.before_hook(&args(&terms, &payload, ExecutionMode::SINGLE_DEFAULT), &mut env)
    }

    #[test]
    fn test_boundary() {
        assert!(run(10, 10).is_ok());
        assert!(run(10, 0).is_ok());
        assert_eq!(
            run(10, 11),
            Err(EnforcerError::rejected("ValueLteEnforcer:value-too-high"))
        );
    }
}

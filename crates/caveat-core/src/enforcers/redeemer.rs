use super::{address_list, EnforcerKind};
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::types::{Address, Caveat};

const NAME: &str = "RedeemerEnforcer";

/// Restricts who may redeem, independent of the delegate field.
///
/// Terms: `n × address(20)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedeemerEnforcer;

impl RedeemerEnforcer {
    pub fn terms(redeemers: &[Address]) -> Vec<u8> {
        redeemers.iter().flat_map(|a| a.0).collect()
    }

    pub fn caveat(redeemers: &[Address]) -> Caveat {
        Caveat::new(EnforcerKind::Redeemer.address(), Self::terms(redeemers))
    }
}

impl CaveatEnforcer for RedeemerEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        if !address_list(hook.terms, NAME)?.contains(&hook.redeemer) {
            return Err(EnforcerError::rejected(format!("{NAME}:unauthorized-redeemer")));
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

    #[test]
    fn test_redeemer_listed() {
        let payload = single(Address::derive("to"), 0, vec![]);
        let host = TestHost::default();
        let mut storage = EnforcerStorage::new();

        let ok_terms = RedeemerEnforcer::terms(&[Address::derive("redeemer")]);
        let mut e = env(&host, &mut storage, EnforcerKind::Redeemer.address());
        RedeemerEnforcer
            .before_hook(&args(&ok_terms, &payload, ExecutionMode::SINGLE_DEFAULT), &mut e)
            .unwrap();

        let bad_terms = RedeemerEnforcer::terms(&[Address::derive("someone-else")]);
        let mut e = env(&host, &mut storage, EnforcerKind::Redeemer.address());
        assert_eq!(
            RedeemerEnforcer
                .before_hook(&args(&bad_terms, &payload, ExecutionMode::SINGLE_DEFAULT), &mut e),
            Err(EnforcerError::rejected("RedeemerEnforcer:unauthorized-redeemer"))
        );
    }
}

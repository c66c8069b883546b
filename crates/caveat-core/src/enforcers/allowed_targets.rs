use super::{address_list, executions, EnforcerKind};
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::types::{Address, Caveat};

const NAME: &str = "AllowedTargetsEnforcer";

/// Restricts which contracts the action may call.
///
/// Terms: `n × address(20)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowedTargetsEnforcer;

impl AllowedTargetsEnforcer {
    pub fn terms(targets: &[Address]) -> Vec<u8> {
        targets.iter().flat_map(|a| a.0).collect()
    }

    pub fn caveat(targets: &[Address]) -> Caveat {
        Caveat::new(EnforcerKind::AllowedTargets.address(), Self::terms(targets))
    }
}

impl CaveatEnforcer for AllowedTargetsEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        let allowed = address_list(hook.terms, NAME)?;
        for call in executions(hook, NAME)? {
            if !allowed.contains(&call.target) {
                return Err(EnforcerError::rejected(format!(
                    "{NAME}:target-address-not-allowed"
                )));
            }
        }
        Ok(())
    }
}

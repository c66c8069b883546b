use super::{executions, EnforcerKind};
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::types::Caveat;

const NAME: &str = "AllowedMethodsEnforcer";

/// Restricts the function selectors the action may call.
///
/// Terms: `n × selector(4)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowedMethodsEnforcer;

impl AllowedMethodsEnforcer {
    pub fn terms(selectors: &[[u8; 4]]) -> Vec<u8> {
        selectors.iter().flatten().copied().collect()
    }

    pub fn caveat(selectors: &[[u8; 4]]) -> Caveat {
        Caveat::new(EnforcerKind::AllowedMethods.address(), Self::terms(selectors))
    }
}

impl CaveatEnforcer for AllowedMethodsEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        if hook.terms.is_empty() || hook.terms.len() % 4 != 0 {
            return Err(EnforcerError::invalid_terms(format!(
                "{NAME}:invalid-terms-length"
            )));
        }
        for call in executions(hook, NAME)? {
            let Some(selector) = call.selector() else {
                return Err(EnforcerError::rejected(format!(
                    "{NAME}:invalid-execution-data-length"
                )));
            };
            if !hook.terms.chunks_exact(4).any(|allowed| allowed == selector.as_slice()) {
                return Err(EnforcerError::rejected(format!("{NAME}:method-not-allowed")));
            }
        }
        Ok(())
    }
}

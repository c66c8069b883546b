use super::{encode_token_amount, single_execution, token_amount_terms, EnforcerKind};
use crate::codec::Erc20Call;
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::types::{Address, Caveat};

const NAME: &str = "ApprovalAmountEnforcer";

/// Limits a token approval.
///
/// Terms: `token(20) ‖ max(32)`. The action must be a single
/// `approve(spender, amount)` on `token` with `amount <= max`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApprovalAmountEnforcer;

impl ApprovalAmountEnforcer {
    pub fn terms(token: &Address, max: u128) -> Vec<u8> {
        encode_token_amount(token, max)
    }

    pub fn caveat(token: &Address, max: u128) -> Caveat {
        Caveat::new(EnforcerKind::ApprovalAmount.address(), Self::terms(token, max))
    }
}

impl CaveatEnforcer for ApprovalAmountEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, _env: &mut HookEnv<'_>) -> HookResult {
        let (token, max) = token_amount_terms(hook.terms, NAME)?;
        let call = single_execution(hook, NAME)?;

        if call.target != token {
            return Err(EnforcerError::rejected(format!("{NAME}:invalid-contract")));
        }
        let Ok(Erc20Call::Approve { amount, .. }) = Erc20Call::decode(&call.call_data) else {
            return Err(EnforcerError::rejected(format!("{NAME}:invalid-method")));
        };
        if amount > max {
            return Err(EnforcerError::rejected(format!("{NAME}:allowance-exceeded")));
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

    fn run(terms: &[u8], target: Address, call: Erc20Call, mode: ExecutionMode) -> HookResult {
        let payload = single(target, 0, call.encode());
        let host = TestHost::default();
        let mut storage = EnforcerStorage::new();
        let mut env = env(&host, &mut storage, EnforcerKind::ApprovalAmount.address());
        ApprovalAmountEnforcer.before_hook(&args(terms, &payload, mode), &mut env)
    }

    fn approve(amount: u128) -> Erc20Call {
        Erc20Call::Approve {
            spender: Address::derive("spender"),
            amount,
        }
    }

    #[test]
    fn test_at_limit_and_above() {
        let token = Address::derive("token");
        let terms = ApprovalAmountEnforcer::terms(&token, 100);
        assert!(run(&terms, token, approve(100), ExecutionMode::SINGLE_DEFAULT).is_ok());
        assert_eq!(
            run(&terms, token, approve(101), ExecutionMode::SINGLE_DEFAULT),
            Err(EnforcerError::rejected("ApprovalAmountEnforcer:allowance-exceeded"))
        );
    }

    #[test]
    fn test_wrong_token_or_method() {
        let token = Address::derive("token");
        let terms = ApprovalAmountEnforcer::terms(&token, 100);
        assert!(run(&terms, Address::derive("other"), approve(1), ExecutionMode::SINGLE_DEFAULT).is_err());

        let transfer = Erc20Call::Transfer {
            to: Address::derive("x"),
            amount: 1,
        };
        assert_eq!(
            run(&terms, token, transfer, ExecutionMode::SINGLE_DEFAULT),
            Err(EnforcerError::rejected("ApprovalAmountEnforcer:invalid-method"))
        );
    }

    #[test]
    fn test_batch_mode_rejected() {
        let token = Address::derive("token");
        let terms = ApprovalAmountEnforcer::terms(&token, 100);
        assert_eq!(
            run(&terms, token, approve(1), ExecutionMode::BATCH_DEFAULT),
            Err(EnforcerError::rejected("ApprovalAmountEnforcer:invalid-call-type"))
        );
    }

    #[test]
    fn test_short_terms() {
        let token = Address::derive("token");
        assert!(matches!(
            run(&[0u8; 51], token, approve(1), ExecutionMode::SINGLE_DEFAULT),
            Err(EnforcerError::InvalidTerms { .. })
        ));
    }
}

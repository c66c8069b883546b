use super::{
    delegation_key, encode_token_amount, single_execution, token_amount_terms, EnforcerKind,
};
use crate::codec::Erc20Call;
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::types::{Address, Caveat};

const NAME: &str = "ERC20TransferAmountEnforcer";

/// Cumulative cap on tokens transferred through one delegation.
///
/// Terms: `token(20) ‖ max(32)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Erc20TransferAmountEnforcer;

impl Erc20TransferAmountEnforcer {
    pub fn terms(token: &Address, max: u128) -> Vec<u8> {
        encode_token_amount(token, max)
    }

    pub fn caveat(token: &Address, max: u128) -> Caveat {
        Caveat::new(
            EnforcerKind::Erc20TransferAmount.address(),
            Self::terms(token, max),
        )
    }
}

impl CaveatEnforcer for Erc20TransferAmountEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, env: &mut HookEnv<'_>) -> HookResult {
        let (token, max) = token_amount_terms(hook.terms, NAME)?;
        let call = single_execution(hook, NAME)?;

        if call.target != token {
            return Err(EnforcerError::rejected(format!("{NAME}:invalid-contract")));
        }
        let Ok(Erc20Call::Transfer { amount, .. }) = Erc20Call::decode(&call.call_data) else {
            return Err(EnforcerError::rejected(format!("{NAME}:invalid-method")));
        };

        let key = delegation_key(&env.caller, &hook.delegation_hash);
        let spent = env
            .storage
            .get_u128(&key)
            .checked_add(amount)
            .filter(|total| *total <= max)
            .ok_or_else(|| EnforcerError::rejected(format!("{NAME}:allowance-exceeded")))?;
        env.storage.set_u128(key, spent);
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
    fn test_cumulative_spend() {
        let token = Address::derive("token");
        let terms = Erc20TransferAmountEnforcer::terms(&token, 100);
        let host = TestHost::default();
        let mut storage = EnforcerStorage::new();

        let transfer = |amount| {
            single(
                token,
                0,
                Erc20Call::Transfer {
                    to: Address::derive("bob"),
                    amount,
                }
                .encode(),
            )
        };

        for amount in [60, 40] {
            let payload = transfer(amount);
            let mut e = env(&host, &mut storage, EnforcerKind::Erc20TransferAmount.address());
            Erc20TransferAmountEnforcer
                .before_hook(&args(&terms, &payload, ExecutionMode::SINGLE_DEFAULT), &mut e)
                .unwrap();
        }

        let payload = transfer(1);
        let mut e = env(&host, &mut storage, EnforcerKind::Erc20TransferAmount.address());
        assert_eq!(
            Erc20TransferAmountEnforcer
                .before_hook(&args(&terms, &payload, ExecutionMode::SINGLE_DEFAULT), &mut e),
            Err(EnforcerError::rejected(
                "ERC20TransferAmountEnforcer:allowance-exceeded"
            ))
        );
    }
}

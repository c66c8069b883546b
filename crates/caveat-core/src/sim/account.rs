//! Smart accounts for the simulation host.
//!
//! Access is checked per operation against an explicit [`CallerContext`]:
//! delegated execution only from the delegation manager, direct execution
//! only from the entry point or the account itself.

use crate::host::{CallerContext, Revert};
use crate::signature::{recover, HybridPolicy, ThresholdPolicy, FAILURE_VALUE, MAGIC_VALUE};
use crate::types::{Address, H256};
use tracing::debug;

/// Signature policy installed on an account.
#[derive(Debug, Clone)]
pub enum AccountValidator {
    SingleOwner(Address),
    Threshold(ThresholdPolicy),
    Hybrid(HybridPolicy),
}

impl AccountValidator {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SingleOwner(_) => "single_owner",
            Self::Threshold(_) => "threshold",
            Self::Hybrid(_) => "hybrid",
        }
    }

    pub fn validate(&self, digest: &H256, signature: &[u8]) -> bool {
        match self {
            Self::SingleOwner(owner) => recover(digest, signature) == Some(*owner),
            Self::Threshold(policy) => policy.validate(digest, signature),
            Self::Hybrid(policy) => policy.validate(digest, signature),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmartAccount {
    validator: Option<AccountValidator>,
}

impl SmartAccount {
    pub fn new(validator: AccountValidator) -> Self {
        Self {
            validator: Some(validator),
        }
    }

    pub fn validator(&self) -> Option<&AccountValidator> {
        self.validator.as_ref()
    }

    pub fn validator_mut(&mut self) -> Option<&mut AccountValidator> {
        self.validator.as_mut()
    }

    /// Contract-signature callout.
    pub fn is_valid_signature(&self, digest: &H256, signature: &[u8]) -> Result<[u8; 4], Revert> {
        let validator = self
            .validator
            .as_ref()
            .ok_or_else(|| Revert::with_reason("account: no validator installed"))?;
        if validator.validate(digest, signature) {
            Ok(MAGIC_VALUE)
        } else {
            Ok(FAILURE_VALUE)
        }
    }

    pub fn check_executor(&self, context: CallerContext) -> Result<(), Revert> {
        match context {
            CallerContext::DelegationManager => Ok(()),
            _ => Err(Revert::with_reason(
                "account: caller is not the delegation manager",
            )),
        }
    }

    pub fn check_execute(&self, context: CallerContext) -> Result<(), Revert> {
        match context {
            CallerContext::EntryPoint | CallerContext::SelfCall => Ok(()),
            _ => Err(Revert::with_reason(
                "account: caller is not the entry point or self",
            )),
        }
    }

    /// Administrative changes to the account's own configuration.
    pub fn check_admin(&self, context: CallerContext) -> Result<(), Revert> {
        match context {
            CallerContext::EntryPoint | CallerContext::SelfCall | CallerContext::Owner => Ok(()),
            CallerContext::DelegationManager => Err(Revert::with_reason(
                "account: delegated calls cannot reconfigure the account",
            )),
        }
    }

    /// Replace the validator. The old validator state is cleared first.
    pub fn migrate(&mut self, next: AccountValidator) -> Option<AccountValidator> {
        let previous = self.validator.take();
        debug!(
            from = previous.as_ref().map(|v| v.kind()).unwrap_or("none"),
            to = next.kind(),
            "account validator migrated"
        );
        self.validator = Some(next);
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use crate::signature::KeySigner;

    #[test]
    fn test_single_owner_callout() {
        let owner = KeySigner::from_label("owner");
        let account = SmartAccount::new(AccountValidator::SingleOwner(owner.address()));
        let digest = sha256(b"d");
        assert_eq!(
            account.is_valid_signature(&digest, &owner.sign_digest(&digest)),
            Ok(MAGIC_VALUE)
        );
        let other = KeySigner::from_label("other");
        assert_eq!(
            account.is_valid_signature(&digest, &other.sign_digest(&digest)),
            Ok(FAILURE_VALUE)
        );
    }

    #[test]
    fn test_context_checks() {
        let account = SmartAccount::new(AccountValidator::SingleOwner(Address::derive("o")));
        assert!(account.check_executor(CallerContext::DelegationManager).is_ok());
        assert!(account.check_executor(CallerContext::EntryPoint).is_err());
        assert!(account.check_execute(CallerContext::SelfCall).is_ok());
        assert!(account.check_execute(CallerContext::DelegationManager).is_err());
        assert!(account.check_admin(CallerContext::Owner).is_ok());
        assert!(account.check_admin(CallerContext::DelegationManager).is_err());
    }

    #[test]
    fn test_migrate_replaces_validator() {
        let old = KeySigner::from_label("old");
        let new = KeySigner::from_label("new");
        let mut account = SmartAccount::new(AccountValidator::SingleOwner(old.address()));

        let previous = account.migrate(AccountValidator::SingleOwner(new.address()));
        assert!(matches!(previous, Some(AccountValidator::SingleOwner(a)) if a == old.address()));

        let digest = sha256(b"d");
        assert_eq!(
            account.is_valid_signature(&digest, &old.sign_digest(&digest)),
            Ok(FAILURE_VALUE)
        );
        assert_eq!(
            account.is_valid_signature(&digest, &new.sign_digest(&digest)),
            Ok(MAGIC_VALUE)
        );
    }
}

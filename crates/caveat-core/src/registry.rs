//! Revocation registry.
//!
//! Durable per-manager state keyed by delegation hash: the disabled set and,
//! when the deployment allows it, the pre-registered set. Ownership checks
//! (only a delegation's own delegator may mutate its entry) happen in the
//! manager, which has the full delegation to compare against.

use crate::error::{DelegationError, DelegationResult};
use crate::types::H256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRegistry {
    #[serde(default)]
    disabled: BTreeSet<H256>,

    #[serde(default)]
    registered: BTreeSet<H256>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disabled(&self, hash: &H256) -> bool {
        self.disabled.contains(hash)
    }

    pub fn is_registered(&self, hash: &H256) -> bool {
        self.registered.contains(hash)
    }

    pub fn disable(&mut self, hash: H256) -> DelegationResult<()> {
        if !self.disabled.insert(hash) {
            return Err(DelegationError::AlreadyDisabled { hash });
        }
        Ok(())
    }

    pub fn enable(&mut self, hash: H256) -> DelegationResult<()> {
        if !self.disabled.remove(&hash) {
            return Err(DelegationError::AlreadyEnabled { hash });
        }
        Ok(())
    }

    pub fn register(&mut self, hash: H256) -> DelegationResult<()> {
        if !self.registered.insert(hash) {
            return Err(DelegationError::AlreadyRegistered { hash });
        }
        Ok(())
    }

    pub fn disabled_count(&self) -> usize {
        self.disabled.len()
    }
}

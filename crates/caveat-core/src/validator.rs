//! Delegation chain validation.
//!
//! Checks run in a fixed order so the first violated invariant is reported
//! deterministically:
//!
//! 1. empty chain: self-authorized, nothing else to check
//! 2. leaf delegate equals the redeemer or is open
//! 3. per element, leaf first: hash, then signature (or pre-registration)
//! 4. per element, leaf first: disabled, then authority and delegate linkage
//! 5. root authority is `ROOT_AUTHORITY`

use crate::error::{DelegationError, DelegationResult};
use crate::hash::typed_data_digest;
use crate::host::HostView;
use crate::registry::RevocationRegistry;
use crate::signature::verify_delegation_signature;
use crate::types::{Address, Delegation, H256, ANY_DELEGATE, ROOT_AUTHORITY};
use tracing::debug;

/// A chain that passed every check, with each element's hash.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatedChain {
    pub delegations: Vec<Delegation>,
    pub hashes: Vec<H256>,
}

impl ValidatedChain {
    pub fn is_empty(&self) -> bool {
        self.delegations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.delegations.len()
    }

    /// Account whose execution capability the chain unlocks.
    pub fn root_delegator(&self) -> Option<Address> {
        self.delegations.last().map(|d| d.delegator)
    }
}

pub struct ChainValidator<'a> {
    domain_hash: H256,
    registry: &'a RevocationRegistry,
    allow_preregistered: bool,
}

impl<'a> ChainValidator<'a> {
    pub fn new(domain_hash: H256, registry: &'a RevocationRegistry) -> Self {
        Self {
            domain_hash,
            registry,
            allow_preregistered: false,
        }
    }

    /// Accept empty signatures on pre-registered delegations.
    pub fn with_preregistered(mut self, allow: bool) -> Self {
        self.allow_preregistered = allow;
        self
    }

    pub fn validate<H: HostView + ?Sized>(
        &self,
        host: &H,
        chain: Vec<Delegation>,
        redeemer: &Address,
    ) -> DelegationResult<ValidatedChain> {
        if chain.is_empty() {
            debug!(redeemer = %redeemer, "self-authorized context");
            return Ok(ValidatedChain::default());
        }

        let leaf = &chain[0];
        if leaf.delegate != *redeemer && leaf.delegate != ANY_DELEGATE {
            return Err(DelegationError::InvalidDelegate {
                index: 0,
                expected: *redeemer,
                got: leaf.delegate,
            });
        }

        let mut hashes = Vec::with_capacity(chain.len());
        for delegation in &chain {
            let hash = delegation.hash();
            self.check_signature(host, delegation, &hash)?;
            hashes.push(hash);
        }

        for (index, delegation) in chain.iter().enumerate() {
            if self.registry.is_disabled(&hashes[index]) {
                return Err(DelegationError::DisabledDelegation {
                    hash: hashes[index],
                });
            }

            let Some(next) = chain.get(index + 1) else {
                continue;
            };
            if delegation.authority != hashes[index + 1] {
                return Err(DelegationError::InvalidAuthority {
                    index,
                    expected: hashes[index + 1],
                    got: delegation.authority,
                });
            }
            if next.delegate != delegation.delegator && next.delegate != ANY_DELEGATE {
                return Err(DelegationError::InvalidDelegate {
                    index: index + 1,
                    expected: delegation.delegator,
                    got: next.delegate,
                });
            }
        }

        let root_index = chain.len() - 1;
        if chain[root_index].authority != ROOT_AUTHORITY {
            return Err(DelegationError::InvalidAuthority {
                index: root_index,
                expected: ROOT_AUTHORITY,
                got: chain[root_index].authority,
            });
        }

        Ok(ValidatedChain {
            delegations: chain,
            hashes,
        })
    }

    fn check_signature<H: HostView + ?Sized>(
        &self,
        host: &H,
        delegation: &Delegation,
        hash: &H256,
    ) -> DelegationResult<()> {
        if delegation.signature.is_empty() {
            if self.allow_preregistered && self.registry.is_registered(hash) {
                return Ok(());
            }
            return Err(DelegationError::EmptySignature { hash: *hash });
        }
        let digest = typed_data_digest(&self.domain_hash, hash);
        verify_delegation_signature(
            host,
            &digest,
            &delegation.signature,
            &delegation.delegator,
            hash,
        )
    }
}

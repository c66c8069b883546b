//! Multi-key threshold validation.
//!
//! A threshold signature is exactly `threshold` key-holder signatures
//! concatenated, ordered by strictly increasing signer address.

use super::key::{recover, KEY_SIGNATURE_LEN};
use super::ValidatorError;
use crate::types::{Address, H256};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdPolicy {
    signers: BTreeSet<Address>,
    threshold: usize,
}

impl ThresholdPolicy {
    pub fn new(
        signers: impl IntoIterator<Item = Address>,
        threshold: usize,
    ) -> Result<Self, ValidatorError> {
        let mut set = BTreeSet::new();
        for signer in signers {
            if signer.is_zero() {
                return Err(ValidatorError::ZeroSigner);
            }
            if !set.insert(signer) {
                return Err(ValidatorError::DuplicateSigner(signer));
            }
        }
        check_threshold(threshold, set.len())?;
        Ok(Self {
            signers: set,
            threshold,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn signers(&self) -> impl Iterator<Item = &Address> {
        self.signers.iter()
    }

    pub fn is_signer(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }

    pub fn add_signer(&mut self, signer: Address) -> Result<(), ValidatorError> {
        if signer.is_zero() {
            return Err(ValidatorError::ZeroSigner);
        }
        if !self.signers.insert(signer) {
            return Err(ValidatorError::DuplicateSigner(signer));
        }
        Ok(())
    }

    /// Remove a signer. Fails if the remaining set could not meet the threshold.
    pub fn remove_signer(&mut self, signer: &Address) -> Result<(), ValidatorError> {
        if !self.signers.contains(signer) {
            return Err(ValidatorError::UnknownSigner(*signer));
        }
        check_threshold(self.threshold, self.signers.len() - 1)?;
        self.signers.remove(signer);
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: usize) -> Result<(), ValidatorError> {
        check_threshold(threshold, self.signers.len())?;
        self.threshold = threshold;
        Ok(())
    }

    /// Check a concatenated signature over `digest`.
    pub fn validate(&self, digest: &H256, signature: &[u8]) -> bool {
        if signature.len() != self.threshold * KEY_SIGNATURE_LEN {
            return false;
        }

        let mut last: Option<Address> = None;
        let mut valid = 0usize;
        for chunk in signature.chunks_exact(KEY_SIGNATURE_LEN) {
            let Some(signer) = recover(digest, chunk) else {
                return false;
            };
            if last.is_some_and(|prev| signer <= prev) {
                return false;
            }
            if !self.signers.contains(&signer) {
                return false;
            }
            last = Some(signer);
            valid += 1;
            if valid == self.threshold {
                return true;
            }
        }
        false
    }
}

fn check_threshold(threshold: usize, signers: usize) -> Result<(), ValidatorError> {
    if threshold == 0 || threshold > signers {
        return Err(ValidatorError::InvalidThreshold { threshold, signers });
    }
    Ok(())
}

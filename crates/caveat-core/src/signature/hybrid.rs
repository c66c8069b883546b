//! Hybrid validation: an optional owner key plus named P-256 credentials.

use super::credential::{key_id_hash, CredentialSignature, CREDENTIAL_SIGNATURE_LEN};
use super::key::{recover, KEY_SIGNATURE_LEN};
use super::ValidatorError;
use crate::types::{Address, H256};
use p256::ecdsa::VerifyingKey;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Credential {
    key_id: String,
    key: VerifyingKey,
}

#[derive(Debug, Clone, Default)]
pub struct HybridPolicy {
    owner: Option<Address>,
    credentials: BTreeMap<H256, Credential>,
}

impl HybridPolicy {
    pub fn new(owner: Option<Address>) -> Self {
        Self {
            owner,
            credentials: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.credentials.values().map(|c| c.key_id.as_str())
    }

    pub fn has_credentials(&self) -> bool {
        self.owner.is_some() || !self.credentials.is_empty()
    }

    pub fn add_key(&mut self, key_id: &str, key: VerifyingKey) -> Result<(), ValidatorError> {
        let id_hash = key_id_hash(key_id);
        if self.credentials.contains_key(&id_hash) {
            return Err(ValidatorError::KeyExists(key_id.to_string()));
        }
        self.credentials.insert(
            id_hash,
            Credential {
                key_id: key_id.to_string(),
                key,
            },
        );
        Ok(())
    }

    /// Remove a credential. The account must keep at least one way to sign.
    pub fn remove_key(&mut self, key_id: &str) -> Result<(), ValidatorError> {
        let id_hash = key_id_hash(key_id);
        if !self.credentials.contains_key(&id_hash) {
            return Err(ValidatorError::UnknownKey(key_id.to_string()));
        }
        if self.owner.is_none() && self.credentials.len() == 1 {
            return Err(ValidatorError::LastCredential);
        }
        self.credentials.remove(&id_hash);
        Ok(())
    }

    pub fn set_owner(&mut self, owner: Option<Address>) -> Result<(), ValidatorError> {
        if owner.is_none() && self.credentials.is_empty() {
            return Err(ValidatorError::LastCredential);
        }
        self.owner = owner;
        Ok(())
    }

    pub fn validate(&self, digest: &H256, signature: &[u8]) -> bool {
        match signature.len() {
            KEY_SIGNATURE_LEN => match (self.owner, recover(digest, signature)) {
                (Some(owner), Some(signer)) => owner == signer,
                _ => false,
            },
            CREDENTIAL_SIGNATURE_LEN => {
                let Some(sig) = CredentialSignature::parse(signature) else {
                    return false;
                };
                self.credentials
                    .get(&sig.key_id_hash)
                    .is_some_and(|cred| sig.verify(&cred.key, digest))
            }
            _ => false,
        }
    }
}

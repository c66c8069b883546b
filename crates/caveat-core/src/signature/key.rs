//! Key-holder signatures.
//!
//! A key-holder signature is `public_key(32) ‖ ed25519_signature(64)`.
//! Recovery verifies the signature against the embedded key and returns the
//! key's address, so a verifier only ever compares addresses.

use crate::hash::{sha256, typed_data_digest};
use crate::types::{Address, Delegation, H256};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

pub const KEY_SIGNATURE_LEN: usize = 96;

/// Address of a key holder: the last 20 bytes of SHA-256 of the public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let digest = sha256(key.as_bytes());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest.as_bytes()[12..]);
    Address(out)
}

/// Recover the signer of `digest`, or `None` if the signature does not verify.
pub fn recover(digest: &H256, signature: &[u8]) -> Option<Address> {
    if signature.len() != KEY_SIGNATURE_LEN {
        return None;
    }
    let key_bytes: [u8; 32] = signature[..32].try_into().ok()?;
    let sig_bytes: [u8; 64] = signature[32..].try_into().ok()?;

    let key = VerifyingKey::from_bytes(&key_bytes).ok()?;
    let sig = Signature::from_bytes(&sig_bytes);
    key.verify_strict(digest.as_bytes(), &sig).ok()?;
    Some(address_of(&key))
}

/// Signing half of a key holder.
#[derive(Clone)]
pub struct KeySigner {
    key: SigningKey,
}

impl KeySigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    /// Deterministic signer for a label (fixtures and scenarios).
    pub fn from_label(label: &str) -> Self {
        Self::from_seed(sha256(label.as_bytes()).as_bytes())
    }

    pub fn seed(&self) -> [u8; 32] {
        self.key.to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn address(&self) -> Address {
        address_of(&self.key.verifying_key())
    }

    /// Sign a 32-byte digest.
    pub fn sign_digest(&self, digest: &H256) -> Vec<u8> {
        let sig = self.key.sign(digest.as_bytes());
        let mut out = Vec::with_capacity(KEY_SIGNATURE_LEN);
        out.extend_from_slice(self.key.verifying_key().as_bytes());
        out.extend_from_slice(&sig.to_bytes());
        out
    }

    /// Signature over a delegation's typed-data digest under `domain_hash`.
    pub fn sign_delegation(&self, domain_hash: &H256, delegation: &Delegation) -> Vec<u8> {
        self.sign_digest(&typed_data_digest(domain_hash, &delegation.hash()))
    }
}

impl std::fmt::Debug for KeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

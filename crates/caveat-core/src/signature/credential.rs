//! P-256 credential signatures.
//!
//! ```text
//! signature = 0x01 ‖ key_id_hash(32) ‖ r(32) ‖ s(32)
//! ```
//!
//! `key_id_hash` selects a registered public key. Signatures with `s` above
//! half the curve order are rejected before verification.

use crate::hash::sha256;
use crate::types::H256;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

pub const CREDENTIAL_SIGNATURE_LEN: usize = 97;
pub const CREDENTIAL_PREFIX: u8 = 0x01;

/// Curve order `n`.
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63, 0x25, 0x51,
];

/// `n / 2`.
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0x80, 0x00, 0x00, 0x00, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xde, 0x73, 0x7d, 0x56, 0xd3, 0x8b, 0xcf, 0x42, 0x79, 0xdc, 0xe5, 0x61, 0x7e, 0x31, 0x92, 0xa8,
];

/// Hash identifying a credential by its textual id.
pub fn key_id_hash(key_id: &str) -> H256 {
    sha256(key_id.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSignature {
    pub key_id_hash: H256,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl CredentialSignature {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != CREDENTIAL_SIGNATURE_LEN || bytes[0] != CREDENTIAL_PREFIX {
            return None;
        }
        Some(Self {
            key_id_hash: H256::from_slice(&bytes[1..33])?,
            r: bytes[33..65].try_into().ok()?,
            s: bytes[65..97].try_into().ok()?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CREDENTIAL_SIGNATURE_LEN);
        out.push(CREDENTIAL_PREFIX);
        out.extend_from_slice(self.key_id_hash.as_bytes());
        out.extend_from_slice(&self.r);
        out.extend_from_slice(&self.s);
        out
    }

    /// Malleability guard: `s <= n/2`.
    pub fn is_low_s(&self) -> bool {
        self.s <= HALF_ORDER
    }

    /// Verify against `key`. High-s signatures never reach the curve check.
    pub fn verify(&self, key: &VerifyingKey, digest: &H256) -> bool {
        if !self.is_low_s() {
            return false;
        }
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        let Ok(sig) = Signature::from_slice(&rs) else {
            return false;
        };
        key.verify_prehash(digest.as_bytes(), &sig).is_ok()
    }
}

/// Named P-256 signing key.
#[derive(Clone)]
pub struct CredentialSigner {
    key_id: String,
    key: SigningKey,
}

impl CredentialSigner {
    pub fn new(key_id: impl Into<String>, key: SigningKey) -> Self {
        Self {
            key_id: key_id.into(),
            key,
        }
    }

    /// Derive a key from a 32-byte seed. `None` if the seed is not a valid scalar.
    pub fn from_seed(key_id: impl Into<String>, seed: &[u8; 32]) -> Option<Self> {
        let key = SigningKey::from_slice(seed).ok()?;
        Some(Self::new(key_id, key))
    }

    pub fn from_label(key_id: impl Into<String>, label: &str) -> Option<Self> {
        Self::from_seed(key_id, sha256(label.as_bytes()).as_bytes())
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&self.key)
    }

    /// Sign `digest`, normalized to low-s.
    pub fn sign_digest(&self, digest: &H256) -> Result<Vec<u8>, p256::ecdsa::Error> {
        let sig: Signature = self.key.sign_prehash(digest.as_bytes())?;
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        if s > HALF_ORDER {
            s = sub_from_order(&s);
        }
        Ok(CredentialSignature {
            key_id_hash: key_id_hash(&self.key_id),
            r,
            s,
        }
        .encode())
    }
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// `n - s` for big-endian 256-bit `s < n`.
fn sub_from_order(s: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = i16::from(CURVE_ORDER[i]) - i16::from(s[i]) - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = diff as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> CredentialSigner {
        CredentialSigner::from_label("laptop", "passkey-seed").unwrap()
    }

    #[test]
    fn test_sign_verify() {
        let signer = signer();
        let digest = sha256(b"op");
        let raw = signer.sign_digest(&digest).unwrap();
        assert_eq!(raw.len(), CREDENTIAL_SIGNATURE_LEN);

        let sig = CredentialSignature::parse(&raw).unwrap();
        assert_eq!(sig.key_id_hash, key_id_hash("laptop"));
        assert!(sig.is_low_s());
        assert!(sig.verify(&signer.verifying_key(), &digest));
        assert!(!sig.verify(&signer.verifying_key(), &sha256(b"other")));
    }

    #[test]
    fn test_high_s_rejected_before_verification() {
        let signer = signer();
        let digest = sha256(b"op");
        let mut sig = CredentialSignature::parse(&signer.sign_digest(&digest).unwrap()).unwrap();
        sig.s = sub_from_order(&sig.s);
        assert!(!sig.is_low_s());
        assert!(!sig.verify(&signer.verifying_key(), &digest));
    }

    #[test]
    fn test_sub_from_order_is_involution() {
        let s = [0x11; 32];
        assert_eq!(sub_from_order(&sub_from_order(&s)), s);
    }

    #[test]
    fn test_half_order_boundary() {
        let at = CredentialSignature {
            key_id_hash: H256::ZERO,
            r: [1; 32],
            s: HALF_ORDER,
        };
        assert!(at.is_low_s());

        let mut above = HALF_ORDER;
        above[31] += 1;
        let sig = CredentialSignature { s: above, ..at };
        assert!(!sig.is_low_s());
    }

    #[test]
    fn test_parse_rejects_bad_prefix_and_length() {
        let signer = signer();
        let mut raw = signer.sign_digest(&sha256(b"op")).unwrap();
        assert!(CredentialSignature::parse(&raw[..96]).is_none());
        raw[0] = 0x02;
        assert!(CredentialSignature::parse(&raw).is_none());
    }
}

//! Structured delegation hashing.
//!
//! Every identifier is SHA-256 over 32-byte words:
//!
//! ```text
//! caveat_hash      = H(CAVEAT_TYPEHASH ‖ word(enforcer) ‖ H(terms))
//! caveat_array     = H(caveat_hash_0 ‖ … ‖ caveat_hash_n)
//! delegation_hash  = H(DELEGATION_TYPEHASH ‖ word(delegate) ‖ word(delegator)
//!                      ‖ authority ‖ caveat_array ‖ word(salt))
//! domain_hash      = H(DOMAIN_TYPEHASH ‖ H(name) ‖ H(version)
//!                      ‖ word(chain_id) ‖ word(verifying_contract))
//! signed_digest    = H(0x19 ‖ 0x01 ‖ domain_hash ‖ delegation_hash)
//! ```
//!
//! Caveat `args` and the delegation `signature` never enter the hash, so a
//! redeemer can attach args without invalidating the delegator's signature.

use crate::types::{Address, Caveat, Delegation, H256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const CAVEAT_TYPE: &str = "Caveat(address enforcer,bytes terms)";

pub const DELEGATION_TYPE: &str = "Delegation(address delegate,address delegator,bytes32 authority,Caveat[] caveats,uint256 salt)Caveat(address enforcer,bytes terms)";

pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// SHA-256 of a byte string.
pub fn sha256(data: &[u8]) -> H256 {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    H256(out)
}

/// SHA-256 over the concatenation of `parts`.
pub fn hash_concat(parts: &[&[u8]]) -> H256 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    H256(out)
}

/// Big-endian `u128` in the low half of a 32-byte word.
pub fn u128_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn caveat_typehash() -> H256 {
    sha256(CAVEAT_TYPE.as_bytes())
}

pub fn delegation_typehash() -> H256 {
    sha256(DELEGATION_TYPE.as_bytes())
}

pub fn domain_typehash() -> H256 {
    sha256(DOMAIN_TYPE.as_bytes())
}

pub fn caveat_hash(caveat: &Caveat) -> H256 {
    let terms_hash = sha256(&caveat.terms);
    hash_concat(&[
        caveat_typehash().as_ref(),
        &caveat.enforcer.to_word(),
        terms_hash.as_ref(),
    ])
}

pub fn caveat_array_hash(caveats: &[Caveat]) -> H256 {
    let mut hasher = Sha256::new();
    for caveat in caveats {
        hasher.update(caveat_hash(caveat).as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    H256(out)
}

/// Canonical identifier of a delegation.
pub fn delegation_hash(delegation: &Delegation) -> H256 {
    hash_concat(&[
        delegation_typehash().as_ref(),
        &delegation.delegate.to_word(),
        &delegation.delegator.to_word(),
        delegation.authority.as_ref(),
        caveat_array_hash(&delegation.caveats).as_ref(),
        &u128_word(delegation.salt),
    ])
}

/// Domain separating signatures per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> H256 {
        hash_concat(&[
            domain_typehash().as_ref(),
            sha256(self.name.as_bytes()).as_ref(),
            sha256(self.version.as_bytes()).as_ref(),
            &u128_word(u128::from(self.chain_id)),
            &self.verifying_contract.to_word(),
        ])
    }
}

/// Digest a delegator actually signs.
pub fn typed_data_digest(domain_hash: &H256, struct_hash: &H256) -> H256 {
    hash_concat(&[&[0x19, 0x01], domain_hash.as_ref(), struct_hash.as_ref()])
}

//! Signature verification.
//!
//! Key holders are checked by recovery. Smart accounts are asked through the
//! host's contract-signature callout and must answer [`MAGIC_VALUE`].

mod credential;
mod hybrid;
mod key;
mod threshold;

pub use credential::{
    key_id_hash, CredentialSignature, CredentialSigner, CREDENTIAL_PREFIX,
    CREDENTIAL_SIGNATURE_LEN,
};
pub use hybrid::HybridPolicy;
pub use key::{address_of, recover, KeySigner, KEY_SIGNATURE_LEN};
pub use threshold::ThresholdPolicy;

use crate::error::DelegationError;
use crate::host::HostView;
use crate::types::{Address, H256};

/// Contract-signature success value.
pub const MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Contract-signature failure value.
pub const FAILURE_VALUE: [u8; 4] = [0xff, 0xff, 0xff, 0xff];

/// Account validator configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    #[error("threshold {threshold} is invalid for {signers} signers")]
    InvalidThreshold { threshold: usize, signers: usize },

    #[error("signer already registered: {0}")]
    DuplicateSigner(Address),

    #[error("signer not registered: {0}")]
    UnknownSigner(Address),

    #[error("zero address cannot be a signer")]
    ZeroSigner,

    #[error("credential already registered: {0}")]
    KeyExists(String),

    #[error("credential not registered: {0}")]
    UnknownKey(String),

    #[error("cannot remove the last remaining credential")]
    LastCredential,
}

/// Check `signature` over `digest` for `delegator`.
///
/// `hash` is the delegation hash, used only for error reporting.
pub fn verify_delegation_signature<H: HostView + ?Sized>(
    host: &H,
    digest: &H256,
    signature: &[u8],
    delegator: &Address,
    hash: &H256,
) -> Result<(), DelegationError> {
    if host.is_contract(delegator) {
        let answer = host
            .is_valid_signature(delegator, digest, signature)
            .map_err(|revert| DelegationError::SignatureCalloutReverted {
                delegator: *delegator,
                reason: revert.to_string(),
            })?;
        if answer != MAGIC_VALUE {
            return Err(DelegationError::InvalidContractSignature {
                delegator: *delegator,
                hash: *hash,
            });
        }
        return Ok(());
    }

    match recover(digest, signature) {
        Some(signer) if signer == *delegator => Ok(()),
        _ => Err(DelegationError::InvalidKeySignature {
            delegator: *delegator,
            hash: *hash,
        }),
    }
}

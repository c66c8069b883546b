//! `caveat keygen` - Generate a signing key file.

use super::super::args::{KeyCurve, KeygenArgs};
use super::{report, write_new};
use crate::exit_codes::SUCCESS;
use anyhow::{Context, Result};
use caveat_core::signature::{CredentialSigner, KeySigner};
use caveat_core::{Address, H256};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk key. The seed is the only secret; everything else is derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "snake_case")]
pub enum KeyFile {
    Ed25519 {
        seed: String,
        address: Address,
    },
    P256 {
        seed: String,
        key_id: String,
        public_key: String,
    },
}

impl KeyFile {
    pub fn ed25519(seed: [u8; 32]) -> Self {
        let signer = KeySigner::from_seed(&seed);
        Self::Ed25519 {
            seed: format!("0x{}", hex::encode(seed)),
            address: signer.address(),
        }
    }

    pub fn p256(key_id: &str, seed: [u8; 32]) -> Result<Self> {
        let signer = CredentialSigner::from_seed(key_id, &seed)
            .context("seed is not a valid P-256 scalar")?;
        let public_key = signer.verifying_key().to_encoded_point(true);
        Ok(Self::P256 {
            seed: format!("0x{}", hex::encode(seed)),
            key_id: key_id.to_string(),
            public_key: format!("0x{}", hex::encode(public_key.as_bytes())),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse key file: {}", path.display()))
    }

    /// Signature bytes over `digest` in the wire format for this key type.
    pub fn sign_digest(&self, digest: &H256) -> Result<Vec<u8>> {
        match self {
            Self::Ed25519 { seed, .. } => {
                Ok(KeySigner::from_seed(&parse_seed(seed)?).sign_digest(digest))
            }
            Self::P256 { seed, key_id, .. } => {
                let signer = CredentialSigner::from_seed(key_id.as_str(), &parse_seed(seed)?)
                    .context("seed is not a valid P-256 scalar")?;
                signer
                    .sign_digest(digest)
                    .map_err(|e| anyhow::anyhow!("P-256 signing failed: {e}"))
            }
        }
    }
}

pub(crate) fn parse_seed(raw: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw)).context("seed is not hex")?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("seed must be 32 bytes, got {}", b.len()))
}

/// Seed derived from a human-readable label (SHA-256 of the label).
pub(crate) fn label_seed(label: &str) -> [u8; 32] {
    caveat_core::hash::sha256(label.as_bytes()).0
}

pub fn cmd_keygen(args: KeygenArgs) -> i32 {
    report(run_keygen(args))
}

fn run_keygen(args: KeygenArgs) -> Result<i32> {
    let seed = match (&args.label, &args.seed) {
        (Some(label), _) => label_seed(label),
        (None, Some(seed)) => parse_seed(seed)?,
        (None, None) => rand::random(),
    };

    let key = match args.curve {
        KeyCurve::Ed25519 => KeyFile::ed25519(seed),
        KeyCurve::P256 => KeyFile::p256(&args.key_id, seed)?,
    };
    let json = serde_json::to_string_pretty(&key)?;

    match &args.out {
        Some(path) => {
            write_new(path, &json, args.force)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o600);
                std::fs::set_permissions(path, perms)
                    .with_context(|| format!("failed to set permissions on: {}", path.display()))?;
            }
            match &key {
                KeyFile::Ed25519 { address, .. } => {
                    println!("Generated ed25519 key: {} (mode 0600)", path.display());
                    println!("address: {address}");
                }
                KeyFile::P256 { key_id, public_key, .. } => {
                    println!("Generated P-256 credential: {} (mode 0600)", path.display());
                    println!("key_id:     {key_id}");
                    println!("public_key: {public_key}");
                }
            }
        }
        None => println!("{json}"),
    }
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_seed_matches_library_signer() {
        let key = KeyFile::ed25519(label_seed("alice"));
        match key {
            KeyFile::Ed25519 { address, .. } => {
                assert_eq!(address, KeySigner::from_label("alice").address());
            }
            KeyFile::P256 { .. } => panic!("wrong curve"),
        }
    }

    #[test]
    fn test_key_file_roundtrip_signs_identically() {
        let key = KeyFile::ed25519([3; 32]);
        let json = serde_json::to_string(&key).unwrap();
        let back: KeyFile = serde_json::from_str(&json).unwrap();
        let digest = H256([1; 32]);
        assert_eq!(
            key.sign_digest(&digest).unwrap(),
            back.sign_digest(&digest).unwrap()
        );
    }

    #[test]
    fn test_parse_seed_length() {
        assert!(parse_seed("0x00").is_err());
        assert!(parse_seed(&"ab".repeat(32)).is_ok());
    }

    #[test]
    fn test_p256_key_signs_credential_format() {
        let key = KeyFile::p256("laptop", [5; 32]).unwrap();
        let sig = key.sign_digest(&H256([2; 32])).unwrap();
        assert_eq!(sig.len(), caveat_core::signature::CREDENTIAL_SIGNATURE_LEN);
    }
}

//! Delegation data model.
//!
//! A [`Delegation`] is a signed, offline-transferable capability grant from a
//! `delegator` to a `delegate`, restricted by an ordered list of [`Caveat`]s.
//! Chains are ordered leaf first: each non-root element points at the hash of
//! the next element through its `authority`, and the root element carries
//! [`ROOT_AUTHORITY`].
//!
//! Text forms of identifiers are `0x`-prefixed lowercase hex.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Error parsing a fixed-width hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Build from a slice of exactly `LEN` bytes.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                let array: [u8; $len] = bytes.try_into().ok()?;
                Some(Self(array))
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(raw).map_err(|e| ParseIdError::Hex(e.to_string()))?;
                Self::from_slice(&bytes).ok_or(ParseIdError::Length {
                    expected: $len,
                    got: bytes.len(),
                })
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// 20-byte account, enforcer or token identity.
    Address,
    20
);

fixed_bytes!(
    /// 32-byte hash value.
    H256,
    32
);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Deterministic address for a namespaced label.
    ///
    /// Used for fixtures that have no key: enforcers, tokens, simulated
    /// smart accounts and the manager itself.
    pub fn derive(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..32]);
        Address(out)
    }

    /// Left-pad to a 32-byte word.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl H256 {
    pub const ZERO: H256 = H256([0u8; 32]);
}

/// Authority value marking a self-originated (root) delegation.
pub const ROOT_AUTHORITY: H256 = H256([0xff; 32]);

/// Delegate value that lets any redeemer use the delegation.
pub const ANY_DELEGATE: Address = Address([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0a, 0x11,
]);

/// Serde helper for byte strings as `0x` hex.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for `u128` values.
///
/// Written as a JSON/YAML number when it fits in 64 bits and as a decimal
/// string otherwise. Both forms are accepted on input.
pub mod decimal_u128 {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(*value) {
            Ok(small) => serializer.serialize_u64(small),
            Err(_) => serializer.collect_str(value),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }

    struct DecimalVisitor;

    impl Visitor<'_> for DecimalVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom("negative value"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.parse().map_err(E::custom)
        }
    }
}

/// One restriction unit attached to a delegation.
///
/// `terms` are fixed at signing time and covered by the delegation hash.
/// `args` are supplied by the redeemer and never signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caveat {
    pub enforcer: Address,

    #[serde(with = "hex_bytes")]
    pub terms: Vec<u8>,

    #[serde(default, with = "hex_bytes", skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<u8>,
}

impl Caveat {
    pub fn new(enforcer: Address, terms: impl Into<Vec<u8>>) -> Self {
        Self {
            enforcer,
            terms: terms.into(),
            args: Vec::new(),
        }
    }

    /// Attach redeemer-supplied args.
    pub fn with_args(mut self, args: impl Into<Vec<u8>>) -> Self {
        self.args = args.into();
        self
    }
}

/// A signed capability grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegate: Address,
    pub delegator: Address,
    pub authority: H256,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<Caveat>,

    #[serde(default, with = "decimal_u128")]
    pub salt: u128,

    #[serde(default, with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl Delegation {
    /// Create an unsigned root delegation with no caveats.
    pub fn new(delegator: Address, delegate: Address) -> Self {
        Self {
            delegate,
            delegator,
            authority: ROOT_AUTHORITY,
            caveats: Vec::new(),
            salt: 0,
            signature: Vec::new(),
        }
    }

    /// Link to a parent delegation hash.
    pub fn with_authority(mut self, authority: H256) -> Self {
        self.authority = authority;
        self
    }

    pub fn with_caveat(mut self, caveat: Caveat) -> Self {
        self.caveats.push(caveat);
        self
    }

    pub fn with_salt(mut self, salt: u128) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn is_root(&self) -> bool {
        self.authority == ROOT_AUTHORITY
    }

    pub fn is_open(&self) -> bool {
        self.delegate == ANY_DELEGATE
    }

    /// Structured hash of this delegation (signature and args excluded).
    pub fn hash(&self) -> H256 {
        crate::hash::delegation_hash(self)
    }
}

//! Permission context encoding.
//!
//! A permission context is a JSON array of delegations, leaf first. An empty
//! byte string and an empty array both mean "self-authorized": the redeemer
//! executes on its own account without any delegation.

use super::CodecError;
use crate::types::Delegation;

pub fn encode_permission_context(chain: &[Delegation]) -> Vec<u8> {
    if chain.is_empty() {
        return Vec::new();
    }
    // Vec<Delegation> serialization cannot fail: every field is a string or integer.
    serde_json::to_vec(chain).unwrap_or_default()
}

pub fn decode_permission_context(context: &[u8]) -> Result<Vec<Delegation>, CodecError> {
    if context.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(context).map_err(|e| CodecError::InvalidContext(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Caveat};

    #[test]
    fn test_empty_context_is_self_authorized() {
        assert!(encode_permission_context(&[]).is_empty());
        assert!(decode_permission_context(b"").unwrap().is_empty());
        assert!(decode_permission_context(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_context_keeps_chain_order() {
        let leaf = Delegation::new(Address::derive("b"), Address::derive("c")).with_salt(1);
        let root = Delegation::new(Address::derive("a"), Address::derive("b"))
            .with_caveat(Caveat::new(Address::derive("e"), vec![1]));
        let encoded = encode_permission_context(&[leaf.clone(), root.clone()]);
        assert_eq!(decode_permission_context(&encoded).unwrap(), vec![leaf, root]);
    }

    #[test]
    fn test_garbage_context_rejected() {
        let err = decode_permission_context(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::InvalidContext(_)));
    }
}

//! Wire codecs for execution payloads, permission contexts and token calls.

pub mod context;
pub mod erc20;
pub mod execution;

pub use context::{decode_permission_context, encode_permission_context};
pub use erc20::{
    Erc20Call, APPROVE_SELECTOR, BALANCE_OF_SELECTOR, TRANSFER_FROM_SELECTOR, TRANSFER_SELECTOR,
};
pub use execution::{
    decode_batch, decode_executions, decode_single, encode_batch, encode_single, CallType,
    ExecType, Execution, ExecutionMode,
};

use crate::types::Address;

/// Wire decoding errors. Always malformed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("truncated input: need {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("unexpected trailing bytes: {0}")]
    TrailingBytes(usize),

    #[error("empty execution batch")]
    EmptyBatch,

    #[error("unsupported call type: {0:#04x}")]
    UnsupportedCallType(u8),

    #[error("unsupported exec type: {0:#04x}")]
    UnsupportedExecType(u8),

    #[error("value does not fit in 128 bits")]
    ValueOverflow,

    #[error("address word has non-zero padding")]
    DirtyAddressWord,

    #[error("unknown selector: 0x{0}")]
    UnknownSelector(String),

    #[error("invalid permission context: {0}")]
    InvalidContext(String),
}

/// Read a `u128` from a 32-byte big-endian word.
pub fn u128_from_word(word: &[u8]) -> Result<u128, CodecError> {
    if word.len() != 32 {
        return Err(CodecError::Truncated {
            expected: 32,
            got: word.len(),
        });
    }
    if word[..16].iter().any(|b| *b != 0) {
        return Err(CodecError::ValueOverflow);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Read an address from a left-padded 32-byte word.
pub fn address_from_word(word: &[u8]) -> Result<Address, CodecError> {
    if word.len() != 32 {
        return Err(CodecError::Truncated {
            expected: 32,
            got: word.len(),
        });
    }
    if word[..12].iter().any(|b| *b != 0) {
        return Err(CodecError::DirtyAddressWord);
    }
    Address::from_slice(&word[12..]).ok_or(CodecError::Truncated {
        expected: 20,
        got: word.len() - 12,
    })
}

/// Split `count` bytes off the front of `input`.
pub(crate) fn take<'a>(input: &mut &'a [u8], count: usize) -> Result<&'a [u8], CodecError> {
    if input.len() < count {
        return Err(CodecError::Truncated {
            expected: count,
            got: input.len(),
        });
    }
    let (head, tail) = input.split_at(count);
    *input = tail;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::u128_word;

    #[test]
    fn test_u128_word_roundtrip() {
        assert_eq!(u128_from_word(&u128_word(123_456)).unwrap(), 123_456);
        assert_eq!(u128_from_word(&u128_word(u128::MAX)).unwrap(), u128::MAX);
    }

    #[test]
    fn test_u128_word_rejects_high_bits() {
        let mut word = [0u8; 32];
        word[0] = 1;
        assert_eq!(u128_from_word(&word), Err(CodecError::ValueOverflow));
    }

    #[test]
    fn test_address_word_rejects_padding() {
        let mut word = Address::derive("x").to_word();
        word[0] = 1;
        assert_eq!(address_from_word(&word), Err(CodecError::DirtyAddressWord));
    }

    #[test]
    fn test_take_advances() {
        let data = [1u8, 2, 3, 4];
        let mut cursor: &[u8] = &data;
        assert_eq!(take(&mut cursor, 3).unwrap(), &[1, 2, 3]);
        assert_eq!(cursor, &[4]);
        assert!(take(&mut cursor, 2).is_err());
    }
}

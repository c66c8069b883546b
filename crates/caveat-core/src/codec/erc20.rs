//! Token call data.
//!
//! Selectors follow the usual fungible-token ABI; arguments are 32-byte words.

use super::{address_from_word, take, u128_from_word, CodecError};
use crate::hash::u128_word;
use crate::types::Address;

pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
pub const TRANSFER_FROM_SELECTOR: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Erc20Call {
    Approve {
        spender: Address,
        amount: u128,
    },
    Transfer {
        to: Address,
        amount: u128,
    },
    TransferFrom {
        from: Address,
        to: Address,
        amount: u128,
    },
    BalanceOf {
        owner: Address,
    },
}

impl Erc20Call {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 96);
        match self {
            Self::Approve { spender, amount } => {
                out.extend_from_slice(&APPROVE_SELECTOR);
                out.extend_from_slice(&spender.to_word());
                out.extend_from_slice(&u128_word(*amount));
            }
            Self::Transfer { to, amount } => {
                out.extend_from_slice(&TRANSFER_SELECTOR);
                out.extend_from_slice(&to.to_word());
                out.extend_from_slice(&u128_word(*amount));
            }
            Self::TransferFrom { from, to, amount } => {
                out.extend_from_slice(&TRANSFER_FROM_SELECTOR);
                out.extend_from_slice(&from.to_word());
                out.extend_from_slice(&to.to_word());
                out.extend_from_slice(&u128_word(*amount));
            }
            Self::BalanceOf { owner } => {
                out.extend_from_slice(&BALANCE_OF_SELECTOR);
                out.extend_from_slice(&owner.to_word());
            }
        }
        out
    }

    pub fn decode(call_data: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = call_data;
        let selector = take(&mut cursor, 4)?;
        let call = match selector {
            s if s == APPROVE_SELECTOR => Self::Approve {
                spender: address_from_word(take(&mut cursor, 32)?)?,
                amount: u128_from_word(take(&mut cursor, 32)?)?,
            },
            s if s == TRANSFER_SELECTOR => Self::Transfer {
                to: address_from_word(take(&mut cursor, 32)?)?,
                amount: u128_from_word(take(&mut cursor, 32)?)?,
            },
            s if s == TRANSFER_FROM_SELECTOR => Self::TransferFrom {
                from: address_from_word(take(&mut cursor, 32)?)?,
                to: address_from_word(take(&mut cursor, 32)?)?,
                amount: u128_from_word(take(&mut cursor, 32)?)?,
            },
            s if s == BALANCE_OF_SELECTOR => Self::BalanceOf {
                owner: address_from_word(take(&mut cursor, 32)?)?,
            },
            other => return Err(CodecError::UnknownSelector(hex::encode(other))),
        };
        if !cursor.is_empty() {
            return Err(CodecError::TrailingBytes(cursor.len()));
        }
        Ok(call)
    }
}

//! Execution modes and execution payload encoding.
//!
//! ```text
//! single = target(20) ‖ value(32) ‖ call_data
//! batch  = count(u32 BE) ‖ { target(20) ‖ value(32) ‖ len(u32 BE) ‖ call_data }*
//! mode   = call_type(1) ‖ exec_type(1) ‖ zero(30)
//! ```

use super::{take, u128_from_word, CodecError};
use crate::hash::u128_word;
use crate::types::{decimal_u128, hex_bytes, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single call made by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub target: Address,

    #[serde(default, with = "decimal_u128")]
    pub value: u128,

    #[serde(default, with = "hex_bytes")]
    pub call_data: Vec<u8>,
}

impl Execution {
    pub fn new(target: Address, value: u128, call_data: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            value,
            call_data: call_data.into(),
        }
    }

    /// First four bytes of the call data, if present.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.call_data.get(..4).and_then(|s| s.try_into().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    #[default]
    Single,
    Batch,
}

impl CallType {
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Single => 0x00,
            Self::Batch => 0x01,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0x00 => Ok(Self::Single),
            0x01 => Ok(Self::Batch),
            other => Err(CodecError::UnsupportedCallType(other)),
        }
    }
}

/// Whether a failing call aborts (`Default`) or is recorded and skipped (`Try`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecType {
    #[default]
    Default,
    Try,
}

impl ExecType {
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Default => 0x00,
            Self::Try => 0x01,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0x00 => Ok(Self::Default),
            0x01 => Ok(Self::Try),
            other => Err(CodecError::UnsupportedExecType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ExecutionMode {
    #[serde(default)]
    pub call_type: CallType,

    #[serde(default)]
    pub exec_type: ExecType,
}

impl ExecutionMode {
    pub const SINGLE_DEFAULT: ExecutionMode = ExecutionMode {
        call_type: CallType::Single,
        exec_type: ExecType::Default,
    };

    pub const BATCH_DEFAULT: ExecutionMode = ExecutionMode {
        call_type: CallType::Batch,
        exec_type: ExecType::Default,
    };

    pub const SINGLE_TRY: ExecutionMode = ExecutionMode {
        call_type: CallType::Single,
        exec_type: ExecType::Try,
    };

    pub const BATCH_TRY: ExecutionMode = ExecutionMode {
        call_type: CallType::Batch,
        exec_type: ExecType::Try,
    };

    pub fn new(call_type: CallType, exec_type: ExecType) -> Self {
        Self {
            call_type,
            exec_type,
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0] = self.call_type.to_byte();
        out[1] = self.exec_type.to_byte();
        out
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CodecError> {
        Ok(Self {
            call_type: CallType::from_byte(bytes[0])?,
            exec_type: ExecType::from_byte(bytes[1])?,
        })
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let call = match self.call_type {
            CallType::Single => "single",
            CallType::Batch => "batch",
        };
        let exec = match self.exec_type {
            ExecType::Default => "default",
            ExecType::Try => "try",
        };
        write!(f, "{call}/{exec}")
    }
}

pub fn encode_single(execution: &Execution) -> Vec<u8> {
    let mut out = Vec::with_capacity(52 + execution.call_data.len());
    out.extend_from_slice(execution.target.as_bytes());
    out.extend_from_slice(&u128_word(execution.value));
    out.extend_from_slice(&execution.call_data);
    out
}

pub fn decode_single(payload: &[u8]) -> Result<Execution, CodecError> {
    let mut cursor = payload;
    let target = take(&mut cursor, 20)?;
    let value = u128_from_word(take(&mut cursor, 32)?)?;
    Ok(Execution {
        target: Address::from_slice(target).unwrap_or_default(),
        value,
        call_data: cursor.to_vec(),
    })
}

pub fn encode_batch(executions: &[Execution]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(executions.len() as u32).to_be_bytes());
    for execution in executions {
        out.extend_from_slice(execution.target.as_bytes());
        out.extend_from_slice(&u128_word(execution.value));
        out.extend_from_slice(&(execution.call_data.len() as u32).to_be_bytes());
        out.extend_from_slice(&execution.call_data);
    }
    out
}

pub fn decode_batch(payload: &[u8]) -> Result<Vec<Execution>, CodecError> {
    let mut cursor = payload;
    let count = read_u32(&mut cursor)? as usize;
    if count == 0 {
        return Err(CodecError::EmptyBatch);
    }

    let mut executions = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        let target = take(&mut cursor, 20)?;
        let value = u128_from_word(take(&mut cursor, 32)?)?;
        let len = read_u32(&mut cursor)? as usize;
        let call_data = take(&mut cursor, len)?;
        executions.push(Execution {
            target: Address::from_slice(target).unwrap_or_default(),
            value,
            call_data: call_data.to_vec(),
        });
    }

    if !cursor.is_empty() {
        return Err(CodecError::TrailingBytes(cursor.len()));
    }
    Ok(executions)
}

/// Decode a payload according to its mode's call type.
pub fn decode_executions(mode: ExecutionMode, payload: &[u8]) -> Result<Vec<Execution>, CodecError> {
    match mode.call_type {
        CallType::Single => Ok(vec![decode_single(payload)?]),
        CallType::Batch => decode_batch(payload),
    }
}

fn read_u32(cursor: &mut &[u8]) -> Result<u32, CodecError> {
    let bytes = take(cursor, 4)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    Ok(u32::from_be_bytes(raw))
}

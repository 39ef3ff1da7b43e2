//! Result validation errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("result must return a \"canExec\" boolean: {result}")]
    MissingCanExec { result: String },

    #[error("canExec result must return callData as a 0x-prefixed hex string of length >= 10: {result}")]
    InvalidV1CallData { result: String },

    #[error("canExec result must return callData as an array: {result}")]
    V2CallDataNotArray { result: String },

    #[error("callData entry {index} has an invalid \"to\" address: {detail}")]
    InvalidCallDataTo { index: usize, detail: String },

    #[error("callData entry {index} has invalid \"data\": {detail}")]
    InvalidCallDataData { index: usize, detail: String },

    #[error("callData entry {index} has a \"value\" that is not a decimal-digit string: {detail}")]
    InvalidCallDataValue { index: usize, detail: String },

    #[error("result is not a JSON object: {result}")]
    NotAnObject { result: String },
}

//! Top-level error type for malformed wire data shared across crates.

use thiserror::Error;

/// Errors raised while constructing or validating a shared wire type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex call data: {0}")]
    InvalidHexCallData(String),

    #[error("invalid gas price: {0}")]
    InvalidGasPrice(String),

    #[error("invalid decimal value: {0}")]
    InvalidDecimalValue(String),
}

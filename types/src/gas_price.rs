//! Arbitrary-precision gas price.
//!
//! `gelatoArgs.gasPrice` can exceed `u128` on some chains under exotic fee
//! configurations, and the wire format is JSON, which has no native bignum.
//! Rather than pull in a bignum crate for a value the runner only ever
//! forwards opaquely to the guest, `GasPrice` is a validated decimal-digit
//! string — the guest is responsible for whatever precision arithmetic it
//! needs.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GasPrice(String);

impl GasPrice {
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypesError::InvalidGasPrice(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn zero() -> Self {
        Self("0".to_string())
    }
}

impl TryFrom<String> for GasPrice {
    type Error = TypesError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<GasPrice> for String {
    fn from(value: GasPrice) -> Self {
        value.0
    }
}

impl fmt::Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-empty decimal-digit string, used for the optional `value` field of
/// a V2 call-data entry (native token amount, in wei, as a string so it
/// survives JSON round-tripping without precision loss).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DecimalString(String);

impl DecimalString {
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypesError::InvalidDecimalValue(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DecimalString {
    type Error = TypesError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DecimalString> for String {
    fn from(value: DecimalString) -> Self {
        value.0
    }
}

impl fmt::Display for DecimalString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! `0x`-prefixed hex payloads: call data and 20-byte addresses.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length of a valid `callData` hex string: `0x` plus at least 8
/// hex characters (a 4-byte selector).
pub const MIN_CALL_DATA_LEN: usize = 10;

/// A `callData` payload: a `0x`-prefixed string at least [`MIN_CALL_DATA_LEN`]
/// characters long.
///
/// Only the `0x` prefix and minimum length are enforced; the remainder is
/// not required to be valid hex digits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexCallData(String);

impl HexCallData {
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if !s.starts_with("0x") {
            return Err(TypesError::InvalidHexCallData(format!(
                "must start with 0x: {s}"
            )));
        }
        if s.len() < MIN_CALL_DATA_LEN {
            return Err(TypesError::InvalidHexCallData(format!(
                "must be at least {MIN_CALL_DATA_LEN} characters: {s}"
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexCallData {
    type Error = TypesError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<HexCallData> for String {
    fn from(value: HexCallData) -> Self {
        value.0
    }
}

impl fmt::Display for HexCallData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A syntactically valid 20-byte EVM address: `0x` followed by exactly 40
/// hex digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| TypesError::InvalidAddress(format!("missing 0x prefix: {s}")))?;
        if hex_part.len() != 40 {
            return Err(TypesError::InvalidAddress(format!(
                "expected 40 hex characters after 0x, got {}: {s}",
                hex_part.len()
            )));
        }
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypesError::InvalidAddress(format!(
                "non-hex character in address: {s}"
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_data_requires_0x_prefix() {
        assert!(HexCallData::parse("deadbeef00").is_err());
    }

    #[test]
    fn call_data_requires_minimum_length() {
        assert!(HexCallData::parse("0xdead").is_err());
        assert!(HexCallData::parse("0x").is_err());
    }

    #[test]
    fn call_data_ten_chars_is_valid() {
        // "0x" + 8 chars = 10 chars total
        assert!(HexCallData::parse("0xdeadbeef").is_ok());
        assert!(HexCallData::parse("0x12345678").is_ok());
    }

    #[test]
    fn call_data_nine_chars_is_invalid() {
        assert!(HexCallData::parse("0x1234567").is_err());
    }

    #[test]
    fn address_requires_exact_length() {
        assert!(Address::parse("0x0000000000000000000000000000000000000001").is_ok());
        assert!(Address::parse("0x00").is_err());
        assert!(Address::parse("0000000000000000000000000000000000000001").is_err());
    }

    #[test]
    fn address_rejects_non_hex() {
        assert!(Address::parse("0x000000000000000000000000000000000000zz01").is_err());
    }
}

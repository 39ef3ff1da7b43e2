//! User-args schema validation and parsing.

pub mod error;

pub use error::ArgsError;

use std::collections::HashMap;
use w3f_types::{ArgType, UserArgs, UserArgsSchema, UserArgsValue};

/// Check each schema key against the supplied typed map.
///
/// Rejects missing keys, wrong primitive types, or (for array types)
/// heterogeneous elements. Note that `UserArgsValue` already carries a
/// single concrete type per array (it is homogeneous by construction), so
/// the heterogeneous-array case can only arise via `parse_user_args`, which
/// builds the value from untyped JSON.
pub fn validate_user_args(schema: &UserArgsSchema, args: &UserArgs) -> Result<(), ArgsError> {
    for (key, expected) in schema {
        let value = args
            .get(key)
            .ok_or_else(|| ArgsError::missing(key, *expected))?;
        if value.arg_type() != *expected {
            return Err(ArgsError::wrong_type(key, *expected));
        }
    }
    Ok(())
}

/// Parse a string map (as arrives from a CLI) into a typed `UserArgs` map,
/// JSON-decoding each value and enforcing the schema.
pub fn parse_user_args(
    schema: &UserArgsSchema,
    raw: &HashMap<String, String>,
) -> Result<UserArgs, ArgsError> {
    let mut parsed = UserArgs::new();

    for (key, expected) in schema {
        let raw_value = raw.get(key).ok_or_else(|| ArgsError::missing(key, *expected))?;
        let json: serde_json::Value =
            serde_json::from_str(raw_value).map_err(|e| ArgsError::InvalidJson {
                key: key.clone(),
                message: e.to_string(),
            })?;
        let value = decode_typed(key, *expected, &json)?;
        parsed.insert(key.clone(), value);
    }

    Ok(parsed)
}

fn decode_typed(
    key: &str,
    expected: ArgType,
    json: &serde_json::Value,
) -> Result<UserArgsValue, ArgsError> {
    match expected {
        ArgType::Boolean => json
            .as_bool()
            .map(UserArgsValue::Boolean)
            .ok_or_else(|| ArgsError::wrong_type(key, expected)),
        ArgType::Number => json
            .as_f64()
            .map(UserArgsValue::Number)
            .ok_or_else(|| ArgsError::wrong_type(key, expected)),
        ArgType::String => json
            .as_str()
            .map(|s| UserArgsValue::String(s.to_string()))
            .ok_or_else(|| ArgsError::wrong_type(key, expected)),
        ArgType::BooleanArray => {
            let items = json.as_array().ok_or_else(|| ArgsError::wrong_type(key, expected))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(
                    item.as_bool()
                        .ok_or_else(|| ArgsError::heterogeneous(key, expected))?,
                );
            }
            Ok(UserArgsValue::BooleanArray(out))
        }
        ArgType::NumberArray => {
            let items = json.as_array().ok_or_else(|| ArgsError::wrong_type(key, expected))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(
                    item.as_f64()
                        .ok_or_else(|| ArgsError::heterogeneous(key, expected))?,
                );
            }
            Ok(UserArgsValue::NumberArray(out))
        }
        ArgType::StringArray => {
            let items = json.as_array().ok_or_else(|| ArgsError::wrong_type(key, expected))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ArgsError::heterogeneous(key, expected))?,
                );
            }
            Ok(UserArgsValue::StringArray(out))
        }
    }
}

//! Result validator: enforces the V1/V2 result contract on the
//! raw JSON a guest returns, producing a typed `ExecutionResult` on success.

pub mod error;

pub use error::ValidationError;

use serde_json::Value;
use w3f_types::{
    Address, CallDataEntry, DecimalString, ExecutionResult, HexCallData, ResultVersion,
};

/// Validate a guest's raw JSON result against the configured schema version.
///
/// `canExec = false` results are accepted regardless of `callData`
/// presence or shape, per universal property 4.
pub fn validate_result(
    version: ResultVersion,
    result: &Value,
) -> Result<ExecutionResult, ValidationError> {
    let obj = result
        .as_object()
        .ok_or_else(|| ValidationError::NotAnObject {
            result: result.to_string(),
        })?;

    let can_exec = obj
        .get("canExec")
        .and_then(Value::as_bool)
        .ok_or_else(|| ValidationError::MissingCanExec {
            result: result.to_string(),
        })?;

    if !can_exec {
        return Ok(match version {
            ResultVersion::V1 => ExecutionResult::V1 {
                can_exec: false,
                call_data: None,
            },
            ResultVersion::V2 => ExecutionResult::V2 {
                can_exec: false,
                call_data: None,
            },
        });
    }

    match version {
        ResultVersion::V1 => {
            let raw = obj
                .get("callData")
                .and_then(Value::as_str)
                .ok_or_else(|| ValidationError::InvalidV1CallData {
                    result: result.to_string(),
                })?;
            let call_data =
                HexCallData::parse(raw).map_err(|_| ValidationError::InvalidV1CallData {
                    result: result.to_string(),
                })?;
            Ok(ExecutionResult::V1 {
                can_exec: true,
                call_data: Some(call_data),
            })
        }
        ResultVersion::V2 => {
            let entries = obj
                .get("callData")
                .and_then(Value::as_array)
                .ok_or_else(|| ValidationError::V2CallDataNotArray {
                    result: result.to_string(),
                })?;

            let mut call_data = Vec::with_capacity(entries.len());
            for (index, entry) in entries.iter().enumerate() {
                call_data.push(validate_call_data_entry(index, entry)?);
            }

            Ok(ExecutionResult::V2 {
                can_exec: true,
                call_data: Some(call_data),
            })
        }
    }
}

fn validate_call_data_entry(
    index: usize,
    entry: &Value,
) -> Result<CallDataEntry, ValidationError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| ValidationError::InvalidCallDataTo {
            index,
            detail: format!("entry is not an object: {entry}"),
        })?;

    let to_raw = obj
        .get("to")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::InvalidCallDataTo {
            index,
            detail: "missing \"to\"".to_string(),
        })?;
    let to = Address::parse(to_raw).map_err(|e| ValidationError::InvalidCallDataTo {
        index,
        detail: e.to_string(),
    })?;

    let data_raw = obj
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::InvalidCallDataData {
            index,
            detail: "missing \"data\"".to_string(),
        })?;
    let data = HexCallData::parse(data_raw).map_err(|e| ValidationError::InvalidCallDataData {
        index,
        detail: e.to_string(),
    })?;

    let value = match obj.get("value") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(DecimalString::parse(s.clone()).map_err(|e| {
            ValidationError::InvalidCallDataValue {
                index,
                detail: e.to_string(),
            }
        })?),
        Some(other) => {
            return Err(ValidationError::InvalidCallDataValue {
                index,
                detail: format!("not a string: {other}"),
            })
        }
    };

    Ok(CallDataEntry { to, data, value })
}

//! The guest's returned `Result`, in both schema versions.
//!
//! This type is constructed by guest handler code directly (there is no
//! scripting VM in this workspace) and serialized onto the wire. Incoming
//! replies are validated and parsed from raw JSON by `w3f-validator`, which
//! knows the configured `ResultVersion` up front and so never needs to guess
//! a variant from shape alone.

use crate::gas_price::DecimalString;
use crate::hexdata::{Address, HexCallData};
use serde::{Deserialize, Serialize};

/// Which result schema a run was configured for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultVersion {
    V1,
    V2,
}

/// A single call in a V2 result's `callData` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDataEntry {
    pub to: Address,
    pub data: HexCallData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<DecimalString>,
}

/// The guest's reply payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum ExecutionResult {
    V1 {
        can_exec: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        call_data: Option<HexCallData>,
    },
    V2 {
        can_exec: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        call_data: Option<Vec<CallDataEntry>>,
    },
}

impl ExecutionResult {
    pub fn can_exec(&self) -> bool {
        match self {
            ExecutionResult::V1 { can_exec, .. } => *can_exec,
            ExecutionResult::V2 { can_exec, .. } => *can_exec,
        }
    }

    pub fn version(&self) -> ResultVersion {
        match self {
            ExecutionResult::V1 { .. } => ResultVersion::V1,
            ExecutionResult::V2 { .. } => ResultVersion::V2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_serializes_camel_case() {
        let r = ExecutionResult::V1 {
            can_exec: true,
            call_data: Some(HexCallData::parse("0xdeadbeef").unwrap()),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["canExec"], serde_json::json!(true));
        assert_eq!(json["callData"], serde_json::json!("0xdeadbeef"));
    }

    #[test]
    fn false_can_exec_serializes_without_call_data() {
        let r = ExecutionResult::V1 {
            can_exec: false,
            call_data: None,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["canExec"], serde_json::json!(false));
        assert!(json.get("callData").is_none());
    }
}

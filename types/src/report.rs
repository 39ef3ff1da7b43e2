//! `ExecutionReport`: the structured result the supervisor returns.

use crate::result::{ExecutionResult, ResultVersion};
use crate::storage::StorageDelta;
use serde::{Deserialize, Serialize};

/// A single quota a run can be throttled on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThrottleReason {
    Duration,
    Memory,
    RpcRequest,
    NetworkRequest,
    Download,
    Upload,
    Storage,
}

/// The set of quotas a run hit, recorded as booleans so the report's JSON
/// shape is stable regardless of how many reasons fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleFlags {
    #[serde(default)]
    pub duration: bool,
    #[serde(default)]
    pub memory: bool,
    #[serde(default)]
    pub rpc_request: bool,
    #[serde(default)]
    pub network_request: bool,
    #[serde(default)]
    pub download: bool,
    #[serde(default)]
    pub upload: bool,
    #[serde(default)]
    pub storage: bool,
}

impl ThrottleFlags {
    pub fn set(&mut self, reason: ThrottleReason) {
        match reason {
            ThrottleReason::Duration => self.duration = true,
            ThrottleReason::Memory => self.memory = true,
            ThrottleReason::RpcRequest => self.rpc_request = true,
            ThrottleReason::NetworkRequest => self.network_request = true,
            ThrottleReason::Download => self.download = true,
            ThrottleReason::Upload => self.upload = true,
            ThrottleReason::Storage => self.storage = true,
        }
    }

    pub fn any(&self) -> bool {
        self.duration
            || self.memory
            || self.rpc_request
            || self.network_request
            || self.download
            || self.upload
            || self.storage
    }
}

/// Final RPC call accounting, copied from the RPC proxy at `stop()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCallCounters {
    pub total: u64,
    pub throttled: u64,
}

/// Final HTTP egress accounting, copied from the HTTP proxy at `stop()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCounters {
    pub nb_requests: u64,
    pub nb_throttled: u64,
    pub download: u64,
    pub upload: u64,
}

/// The structured report a `run()` call produces, success or failure.
///
/// Serialize-only, like `ExecutionResult` it carries: a report is something
/// the supervisor produces and the CLI prints, never something this
/// workspace parses back in.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub success: bool,
    pub version: ResultVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageDelta>,
    /// KB, present alongside `storage` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_size_kb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub duration: f64,
    pub memory: f64,
    pub rpc_calls: RpcCallCounters,
    pub network: NetworkCounters,
    pub throttled: ThrottleFlags,
}

//! `ContextData`: the input the supervisor assembles once per run and hands
//! to the guest.

use crate::gas_price::GasPrice;
use crate::user_args::UserArgs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chain-level arguments the task runtime injects.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GelatoArgs {
    pub chain_id: u64,
    pub gas_price: GasPrice,
    pub task_id: String,
    /// V1 only: seconds since epoch, injected by the supervisor at run
    /// start. Absent for V2 runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
}

/// The full input record handed to the guest's `start` message.
///
/// Frozen at guest entry except for `storage`, which the guest may mutate;
/// the delta is extracted at guest exit.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextData {
    pub gelato_args: GelatoArgs,
    pub user_args: UserArgs,
    pub secrets: HashMap<String, String>,
    pub storage: HashMap<String, String>,
    pub rpc_provider_url: String,
    /// Present only for event-triggered invocations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<serde_json::Value>,
}

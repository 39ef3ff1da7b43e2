//! `RunPayload`: everything a caller supplies for one `run` invocation,
//! distinct from `RunnerOptions` (the quotas/config side).

use std::collections::HashMap;

use serde_json::Value;
use w3f_types::{GasPrice, MultiChainProviderConfig, ResultVersion, ScriptArtifact, UserArgs};

#[derive(Clone, Debug)]
pub struct RunPayload {
    pub script: ScriptArtifact,
    pub version: ResultVersion,
    pub chain_id: u64,
    pub gas_price: GasPrice,
    pub task_id: String,
    pub user_args: UserArgs,
    pub secrets: HashMap<String, String>,
    pub storage: HashMap<String, String>,
    pub providers: MultiChainProviderConfig,
    /// Present only for event-triggered invocations.
    pub log: Option<Value>,
}

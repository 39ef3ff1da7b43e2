//! The context facade handed to a registered handler: `gelatoArgs`
//! with gas price lifted to arbitrary-precision, the RPC facade, `userArgs`
//! passed through, `secrets.get`, and a mutable `storage` copy.

use std::collections::HashMap;

use serde_json::Value;
use w3f_types::{ContextData, GasPrice, UserArgs};

use crate::error::GuestRuntimeError;
use crate::rpc::RpcFacade;

/// The facade a handler interacts with. Wraps the frozen parts of
/// `ContextData` and a mutable local copy of `storage`; the pre-invocation
/// snapshot is kept separately so the diff can be computed at exit.
pub struct GuestContext {
    pub chain_id: u64,
    pub gas_price: GasPrice,
    pub task_id: String,
    pub block_time: Option<u64>,
    pub user_args: UserArgs,
    pub log: Option<Value>,
    pub rpc: RpcFacade,

    secrets: HashMap<String, String>,
    storage_pre: HashMap<String, String>,
    storage: HashMap<String, String>,
}

impl GuestContext {
    pub fn from_context_data(context: ContextData) -> Self {
        let rpc = RpcFacade::new(context.rpc_provider_url, context.gelato_args.chain_id);
        Self {
            chain_id: context.gelato_args.chain_id,
            gas_price: context.gelato_args.gas_price,
            task_id: context.gelato_args.task_id,
            block_time: context.gelato_args.block_time,
            user_args: context.user_args,
            log: context.log,
            rpc,
            secrets: context.secrets,
            storage_pre: context.storage.clone(),
            storage: context.storage,
        }
    }

    /// Whether this invocation carries event-context data.
    pub fn is_event(&self) -> bool {
        self.log.is_some()
    }

    pub fn secret(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }

    pub fn storage_get(&self, key: &str) -> Option<&str> {
        self.storage.get(key).map(String::as_str)
    }

    /// Rejects non-string values with a typed error.
    pub fn storage_set(&mut self, key: impl Into<String>, value: Value) -> Result<(), GuestRuntimeError> {
        let key = key.into();
        match value {
            Value::String(s) => {
                self.storage.insert(key, s);
                Ok(())
            }
            _ => Err(GuestRuntimeError::NonStringStorageValue(key)),
        }
    }

    /// Records a tombstone for `key`.
    pub fn storage_delete(&mut self, key: &str) {
        self.storage.remove(key);
    }

    pub(crate) fn pre_storage(&self) -> &HashMap<String, String> {
        &self.storage_pre
    }

    pub(crate) fn post_storage(&self) -> &HashMap<String, String> {
        &self.storage
    }
}

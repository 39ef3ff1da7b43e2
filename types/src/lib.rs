//! Shared wire and report types for the web3 function execution runtime.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: the guest's `ContextData` input, the `Result` the guest
//! returns, the `StorageDelta` it computes, the `ExecutionReport` the
//! supervisor produces, and the `RunnerOptions` that configure a run.

pub mod chain;
pub mod context;
pub mod error;
pub mod gas_price;
pub mod hexdata;
pub mod options;
pub mod report;
pub mod result;
pub mod script;
pub mod storage;
pub mod user_args;

pub use chain::{ChainId, MultiChainProviderConfig};
pub use context::{ContextData, GelatoArgs};
pub use error::TypesError;
pub use gas_price::{DecimalString, GasPrice};
pub use hexdata::{Address, HexCallData};
pub use options::{RunnerOptions, SandboxRuntime};
pub use report::{
 ExecutionReport, NetworkCounters, RpcCallCounters, ThrottleFlags, ThrottleReason,
};
pub use result::{CallDataEntry, ExecutionResult, ResultVersion};
pub use script::ScriptArtifact;
pub use storage::{StorageDelta, StorageState};
pub use user_args::{ArgType, UserArgs, UserArgsSchema, UserArgsValue};

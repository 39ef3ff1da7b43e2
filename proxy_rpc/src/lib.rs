//! Chain RPC proxy: routes guest JSON-RPC calls per chain id,
//! counts them, and enforces the configured call budget.

pub mod error;
pub mod server;
pub mod stats;

pub use error::ProxyRpcError;
pub use server::{RpcProxy, RpcProxyConfig};
pub use stats::RpcStats;

//! RPC proxy errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyRpcError {
    #[error("failed to bind RPC proxy listener: {0}")]
    Bind(std::io::Error),

    #[error("no upstream RPC provider configured for chain id {0} and no default is set")]
    NoUpstream(u64),
}

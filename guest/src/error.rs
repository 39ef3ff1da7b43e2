//! Handler-facing errors. Converted to the wire `GuestError` at the
//! protocol boundary; never exposed to the supervisor directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuestRuntimeError {
    #[error("no handler registered for this invocation")]
    HandlerNotRegistered,

    #[error("storage value for key {0:?} is not a string")]
    NonStringStorageValue(String),

    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("{0}: {1}")]
    Handler(String, String),
}

impl GuestRuntimeError {
    /// The `{name, message}` shape the wire protocol carries.
    pub fn name(&self) -> &'static str {
        match self {
            GuestRuntimeError::HandlerNotRegistered => "HandlerNotRegistered",
            GuestRuntimeError::NonStringStorageValue(_) => "TypeError",
            GuestRuntimeError::Rpc(_) => "RpcError",
            GuestRuntimeError::Handler(..) => "HandlerError",
        }
    }
}

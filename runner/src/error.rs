//! Supervisor-side error taxonomy. `stop`'s own errors are logged,
//! never surfaced through this type.

use thiserror::Error;
use w3f_types::ThrottleReason;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("port allocation failed: {0}")]
    PortAllocation(#[from] w3f_utils::PortAllocationError),

    #[error("failed to start HTTP egress proxy: {0}")]
    HttpProxy(#[from] w3f_proxy_http::ProxyHttpError),

    #[error("failed to start RPC proxy: {0}")]
    RpcProxy(#[from] w3f_proxy_rpc::ProxyRpcError),

    #[error("failed to start sandbox: {0}")]
    Sandbox(#[from] w3f_sandbox::SandboxError),

    #[error("guest transport error: {0}")]
    Transport(#[from] w3f_protocol::ProtocolError),

    #[error("result validation failed: {0}")]
    Validation(#[from] w3f_validator::ValidationError),

    #[error("guest reported an error: {name}: {message}")]
    GuestError { name: String, message: String },

    #[error("guest exited silently with no result")]
    SilentExit,

    #[error("guest process exited with code {0}")]
    GenericExit(i32),

    /// A quota violation detected by the supervisor itself (timeout,
    /// memory cap, RPC throttle) rather than surfaced by a subsystem error
    /// type above. Carries the exact `ThrottleReason` so the report can be
    /// tagged without re-deriving it from the failure a second time.
    #[error("run throttled: {reason:?}")]
    Throttled { reason: ThrottleReason },
}

impl RunnerError {
    /// The throttle reason this failure should be recorded under, if any.
    pub fn throttle_reason(&self) -> Option<ThrottleReason> {
        match self {
            RunnerError::Throttled { reason } => Some(*reason),
            _ => None,
        }
    }
}

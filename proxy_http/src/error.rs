//! HTTP egress proxy errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyHttpError {
    #[error("failed to bind HTTP egress proxy listener: {0}")]
    Bind(std::io::Error),

    #[error("HTTP egress proxy server task failed to join cleanly: {0}")]
    JoinFailed(String),
}

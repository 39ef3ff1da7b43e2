use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("guest did not become reachable within the startup budget")]
    StartupTimeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status from guest: {0}")]
    UnexpectedStatus(u16),

    #[error("malformed protocol message: {0}")]
    Malformed(String),

    #[error("server error: {0}")]
    Server(String),
}

//! Sandbox lifecycle errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to spawn guest process: {0}")]
    Spawn(std::io::Error),

    #[error("failed to wait on guest process: {0}")]
    Wait(std::io::Error),

    #[error("container runtime command failed: {0}")]
    ContainerRuntime(String),

    #[error("sandbox was not started")]
    NotStarted,
}

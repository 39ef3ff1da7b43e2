//! Sandbox abstraction: starts and stops a guest process with a
//! memory cap, environment, and network configuration, and exposes memory
//! sampling, exit-code waiting, and log capture. Two variants —
//! [`ThreadSandbox`] and, behind the `container-runtime` feature,
//! `ContainerSandbox` — implement the single [`Sandbox`] trait so the
//! supervisor is generic over the runtime.

pub mod error;
pub mod logs;
pub mod memory;
pub mod thread_sandbox;

#[cfg(feature = "container-runtime")]
pub mod container_sandbox;

pub use error::SandboxError;
pub use thread_sandbox::ThreadSandbox;

#[cfg(feature = "container-runtime")]
pub use container_sandbox::ContainerSandbox;

use async_trait::async_trait;
use w3f_types::{ResultVersion, ScriptArtifact};

/// Everything a sandbox variant needs to start the guest for one run.
#[derive(Clone, Debug)]
pub struct SandboxSpec {
    pub script: ScriptArtifact,
    pub version: ResultVersion,
    pub server_port: u16,
    pub mount_path: String,
    pub proxy_host: String,
    pub proxy_http_port: u16,
    pub blacklisted_hosts: Vec<String>,
    pub memory_limit_bytes: u64,
    pub show_logs: bool,
}

/// How the guest process ended, in enough detail for the supervisor's
/// exit-code classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitSignal {
    /// Exited normally (or via `std::process::exit`) with this code.
    Code(i32),
    /// Killed by this signal (Unix only; container OOM kill surfaces as
    /// signal 137, even though 137 is conventionally reported as an
    /// exit *code* by `docker wait` — callers should treat the two
    /// uniformly).
    Signal(i32),
}

/// The capability set every sandbox variant implements: start, stop, wait
/// for exit, sample memory, and retrieve captured logs.
#[async_trait]
pub trait Sandbox: Send {
    async fn start(&mut self, spec: SandboxSpec) -> Result<(), SandboxError>;

    /// Idempotent; never propagates errors.
    async fn stop(&mut self);

    /// Resolves once the guest process has exited, however it exited.
    async fn wait_for_process_end(&mut self) -> Result<ExitSignal, SandboxError>;

    /// Current resident memory in bytes. Sampled by the supervisor on a
    /// 100 ms interval and compared against `options.memory`.
    fn get_memory_usage(&self) -> u64;

    fn get_logs(&self) -> Vec<String>;
}

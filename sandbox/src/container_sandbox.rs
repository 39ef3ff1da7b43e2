//! Container sandbox (`container-runtime` feature): runs the guest
//! inside a `docker run` container instead of as a bare child process.
//! Gated behind a feature flag so the crate builds on hosts without a
//! `docker` binary.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::warn;

use crate::error::SandboxError;
use crate::logs::{spawn_line_reader, LogBuffer};
use crate::memory;
use crate::{ExitSignal, Sandbox, SandboxSpec};

/// Guest process run inside a Docker container, giving it full namespace
/// and filesystem isolation at the cost of requiring a container runtime
/// on the host.
pub struct ContainerSandbox {
    container_name: Option<String>,
    child: Option<tokio::process::Child>,
    logs: LogBuffer,
    reader_tasks: Vec<tokio::task::JoinHandle<()>>,
    host_pid: Option<u32>,
}

impl ContainerSandbox {
    pub fn new() -> Self {
        Self {
            container_name: None,
            child: None,
            logs: LogBuffer::new(),
            reader_tasks: Vec::new(),
            host_pid: None,
        }
    }

    async fn docker_inspect_pid(name: &str) -> Option<u32> {
        let output = Command::new("docker")
            .args(["inspect", "--format", "{{.State.Pid}}", name])
            .output()
            .await
            .ok()?;
        String::from_utf8(output.stdout).ok()?.trim().parse().ok()
    }
}

impl Default for ContainerSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sandbox for ContainerSandbox {
    async fn start(&mut self, spec: SandboxSpec) -> Result<(), SandboxError> {
        let name = format!("w3f-guest-{}", uuid_like_suffix());
        let memory_limit = spec.memory_limit_bytes;

        let mut command = Command::new("docker");
        command
            .args(["run", "--rm", "--name", &name])
            .arg(format!("--memory={memory_limit}"))
            .arg("--add-host=host.docker.internal:host-gateway")
            .arg("-e")
            .arg(format!("WEB3_FUNCTION_SERVER_PORT={}", spec.server_port))
            .arg("-e")
            .arg(format!("WEB3_FUNCTION_MOUNT_PATH={}", spec.mount_path))
            .arg("-e")
            .arg(format!(
                "HTTP_PROXY=http://{}:{}",
                spec.proxy_host, spec.proxy_http_port
            ))
            .arg("-e")
            .arg(format!(
                "HTTPS_PROXY=http://{}:{}",
                spec.proxy_host, spec.proxy_http_port
            ))
            .arg("-v")
            .arg(format!("{}:/guest/entry:ro", spec.script.path().display()))
            .arg("w3f-guest-runtime:latest")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(SandboxError::Spawn)?;

        if let Some(stdout) = child.stdout.take() {
            self.reader_tasks
                .push(spawn_line_reader(stdout, "stdout", self.logs.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            self.reader_tasks
                .push(spawn_line_reader(stderr, "stderr", self.logs.clone()));
        }

        self.container_name = Some(name.clone());
        self.child = Some(child);
        self.host_pid = Self::docker_inspect_pid(&name).await;
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(name) = self.container_name.take() {
            let status = Command::new("docker").args(["kill", &name]).status().await;
            if let Err(err) = status {
                warn!(error = %err, container = %name, "failed to kill guest container");
            }
        }
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
        }
        for task in self.reader_tasks.drain(..) {
            task.abort();
        }
    }

    async fn wait_for_process_end(&mut self) -> Result<ExitSignal, SandboxError> {
        let child = self.child.as_mut().ok_or(SandboxError::NotStarted)?;
        let status = child.wait().await.map_err(SandboxError::Wait)?;
        for task in self.reader_tasks.drain(..) {
            let _ = task.await;
        }
        // `docker run --rm` exits with the container's own exit code,
        // including 137 on an OOM kill.
        Ok(ExitSignal::Code(status.code().unwrap_or(-1)))
    }

    fn get_memory_usage(&self) -> u64 {
        self.host_pid.and_then(memory::read_rss_bytes).unwrap_or(0)
    }

    fn get_logs(&self) -> Vec<String> {
        self.logs.snapshot()
    }
}

fn uuid_like_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{nanos:x}")
}

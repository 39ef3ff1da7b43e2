//! Thread-runtime sandbox (default variant): spawns the guest as a
//! plain child process with a hard memory rlimit, forwards its stdout and
//! stderr into a log buffer, and samples `/proc/<pid>/status` for live RSS.

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::SandboxError;
use crate::logs::{spawn_line_reader, LogBuffer};
use crate::memory;
use crate::{ExitSignal, Sandbox, SandboxSpec};

/// Guest process spawned directly on the host, capability-restricted only
/// by POSIX rlimits (no namespace or filesystem isolation). This is the
/// variant used when `RunnerOptions::runtime` is left at its default
/// (`SandboxRuntime::Thread`).
pub struct ThreadSandbox {
    child: Option<Child>,
    logs: LogBuffer,
    reader_tasks: Vec<JoinHandle<()>>,
    memory_limit_bytes: u64,
}

impl ThreadSandbox {
    pub fn new() -> Self {
        Self {
            child: None,
            logs: LogBuffer::new(),
            reader_tasks: Vec::new(),
            memory_limit_bytes: 0,
        }
    }
}

impl Default for ThreadSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sandbox for ThreadSandbox {
    async fn start(&mut self, spec: SandboxSpec) -> Result<(), SandboxError> {
        let mut command = Command::new(spec.script.path());
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("WEB3_FUNCTION_SERVER_PORT", spec.server_port.to_string())
            .env("WEB3_FUNCTION_MOUNT_PATH", &spec.mount_path)
            .env(
                "HTTP_PROXY",
                format!("http://{}:{}", spec.proxy_host, spec.proxy_http_port),
            )
            .env(
                "HTTPS_PROXY",
                format!("http://{}:{}", spec.proxy_host, spec.proxy_http_port),
            );

        let memory_limit_bytes = spec.memory_limit_bytes;

        // SAFETY: pre_exec runs after fork, before exec, in the child; it
        // only touches async-signal-safe libc calls (setrlimit).
        unsafe {
            command.pre_exec(move || {
                let rlimit = libc::rlimit {
                    rlim_cur: memory_limit_bytes,
                    rlim_max: memory_limit_bytes,
                };
                if libc::setrlimit(libc::RLIMIT_AS, &rlimit) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let mut child = command.spawn().map_err(SandboxError::Spawn)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        if let Some(stdout) = stdout {
            self.reader_tasks
                .push(spawn_line_reader(stdout, "stdout", self.logs.clone()));
        }
        if let Some(stderr) = stderr {
            self.reader_tasks
                .push(spawn_line_reader(stderr, "stderr", self.logs.clone()));
        }

        self.memory_limit_bytes = memory_limit_bytes;
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                if let Err(err) = child.start_kill() {
                    warn!(error = %err, "failed to kill guest process");
                }
            }
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
        Ok(match status.signal() {
            Some(signal) => ExitSignal::Signal(signal),
            None => ExitSignal::Code(status.code().unwrap_or(-1)),
        })
    }

    fn get_memory_usage(&self) -> u64 {
        self.child
            .as_ref()
            .and_then(|child| child.id())
            .and_then(memory::read_rss_bytes)
            .unwrap_or(0)
    }

    fn get_logs(&self) -> Vec<String> {
        self.logs.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use w3f_types::ResultVersion;

    fn spec_for(script: &str) -> SandboxSpec {
        SandboxSpec {
            script: script.into(),
            version: ResultVersion::V2,
            server_port: 0,
            mount_path: "/tmp/w3f-test".to_string(),
            proxy_host: "127.0.0.1".to_string(),
            proxy_http_port: 0,
            blacklisted_hosts: Vec::new(),
            memory_limit_bytes: 256 * 1024 * 1024,
            show_logs: false,
        }
    }

    #[tokio::test]
    async fn runs_and_captures_exit_code() {
        let mut sandbox = ThreadSandbox::new();
        sandbox.start(spec_for("/bin/true")).await.unwrap();
        let exit = sandbox.wait_for_process_end().await.unwrap();
        assert_eq!(exit, ExitSignal::Code(0));
    }

    #[tokio::test]
    async fn captures_stdout_lines() {
        let mut sandbox = ThreadSandbox::new();
        sandbox.start(spec_for("/bin/echo")).await.unwrap();
        sandbox.wait_for_process_end().await.unwrap();
        let logs = sandbox.get_logs();
        assert!(logs.iter().any(|l| l.contains("stdout")));
    }

    #[tokio::test]
    async fn wait_before_start_errors() {
        let mut sandbox = ThreadSandbox::new();
        let err = sandbox.wait_for_process_end().await.unwrap_err();
        assert!(matches!(err, SandboxError::NotStarted));
    }
}

//! `RunnerOptions`: per-run configuration for the supervisor.

use serde::{Deserialize, Serialize};

/// Which sandbox variant to run the guest under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxRuntime {
    Thread,
    Container,
}

impl Default for SandboxRuntime {
    fn default() -> Self {
        SandboxRuntime::Thread
    }
}

/// Per-run quotas and configuration, loadable from TOML or built
/// programmatically.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerOptions {
    #[serde(default)]
    pub runtime: SandboxRuntime,
    #[serde(default = "default_memory_bytes")]
    pub memory: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout: u64,
    #[serde(default = "default_rpc_limit")]
    pub rpc_limit: u64,
    #[serde(default = "default_request_limit")]
    pub request_limit: u64,
    #[serde(default = "default_download_limit")]
    pub download_limit: u64,
    #[serde(default = "default_upload_limit")]
    pub upload_limit: u64,
    #[serde(default = "default_storage_limit_kb")]
    pub storage_limit_kb: u64,
    #[serde(default)]
    pub blacklisted_hosts: Vec<String>,
    #[serde(default)]
    pub show_logs: bool,
    #[serde(default)]
    pub server_port: Option<u16>,
}

fn default_memory_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_rpc_limit() -> u64 {
    100
}

fn default_request_limit() -> u64 {
    100
}

fn default_download_limit() -> u64 {
    5 * 1024 * 1024
}

fn default_upload_limit() -> u64 {
    1024 * 1024
}

fn default_storage_limit_kb() -> u64 {
    128
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            runtime: SandboxRuntime::default(),
            memory: default_memory_bytes(),
            timeout: default_timeout_ms(),
            rpc_limit: default_rpc_limit(),
            request_limit: default_request_limit(),
            download_limit: default_download_limit(),
            upload_limit: default_upload_limit(),
            storage_limit_kb: default_storage_limit_kb(),
            blacklisted_hosts: Vec::new(),
            show_logs: false,
            server_port: None,
        }
    }
}

impl RunnerOptions {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| e.to_string())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("RunnerOptions is always serializable to TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_round_trip_through_toml() {
        let opts = RunnerOptions::default();
        let s = opts.to_toml_string();
        let parsed = RunnerOptions::from_toml_str(&s).expect("should parse");
        assert_eq!(parsed.timeout, opts.timeout);
        assert_eq!(parsed.memory, opts.memory);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let opts = RunnerOptions::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(opts.rpc_limit, 100);
        assert_eq!(opts.runtime, SandboxRuntime::Thread);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let toml = "timeout = 5000\nrpcLimit = 3\n";
        let opts = RunnerOptions::from_toml_str(toml).expect("should parse");
        assert_eq!(opts.timeout, 5000);
        assert_eq!(opts.rpc_limit, 3);
        assert_eq!(opts.memory, default_memory_bytes());
    }
}

//! `w3f-run` — command-line entry point for the web3 function supervisor.
//!
//! Wires a `RunnerOptions` (TOML file plus per-field overrides), a
//! `RunPayload` (script path plus invocation context), and a
//! `RunnerSupervisor`, then prints the resulting `ExecutionReport` as JSON
//! on stdout. Exits non-zero when the run did not succeed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use w3f_runner::{RunPayload, RunnerSupervisor};
use w3f_types::{
    GasPrice, MultiChainProviderConfig, ResultVersion, RunnerOptions, SandboxRuntime,
    ScriptArtifact, UserArgsSchema,
};

/// Runs a single web3 function script under supervision and prints its
/// execution report.
#[derive(Parser)]
#[command(name = "w3f-run", about = "Run a web3 function script under supervision")]
struct Cli {
    /// Path to the compiled guest script/binary to execute.
    script: PathBuf,

    /// Path to a TOML file of `RunnerOptions`. CLI flags below override
    /// individual fields on top of this file (or the defaults, if no file
    /// is given).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sandbox runtime to use.
    #[arg(long, value_enum)]
    runtime: Option<CliSandboxRuntime>,

    /// Hard memory cap for the guest process, in bytes.
    #[arg(long)]
    memory_bytes: Option<u64>,

    /// Wall-clock execution timeout, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum RPC calls the guest may make through the RPC proxy.
    #[arg(long)]
    rpc_limit: Option<u64>,

    /// Maximum HTTP requests the guest may make through the egress proxy.
    #[arg(long)]
    request_limit: Option<u64>,

    /// Maximum cumulative download bytes through the egress proxy.
    #[arg(long)]
    download_limit_bytes: Option<u64>,

    /// Maximum cumulative upload bytes through the egress proxy.
    #[arg(long)]
    upload_limit_bytes: Option<u64>,

    /// Maximum serialized storage size, in KB, before a run is throttled.
    #[arg(long)]
    storage_limit_kb: Option<u64>,

    /// A host to add to the egress blocklist. Repeatable.
    #[arg(long = "blacklist-host")]
    blacklist_hosts: Vec<String>,

    /// Capture and print the guest's stdout/stderr in the report.
    #[arg(long)]
    show_logs: bool,

    /// Log rendering format.
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    /// Numeric chain id the invocation runs against.
    #[arg(long, default_value_t = 1)]
    chain_id: u64,

    /// Current gas price, as a decimal-digit string.
    #[arg(long, default_value = "0")]
    gas_price: String,

    /// Task id forwarded to the guest as `gelatoArgs.taskId`.
    #[arg(long, default_value = "local")]
    task_id: String,

    /// Result schema version the guest is expected to reply with.
    #[arg(long, value_enum, default_value_t = CliResultVersion::V2)]
    result_version: CliResultVersion,

    /// Path to a JSON file declaring the user-args schema (`{"name":
    /// "number", ...}`), used to validate `--user-arg` values.
    #[arg(long)]
    user_args_schema: Option<PathBuf>,

    /// A `key=value` user arg, JSON-decoded and validated against
    /// `--user-args-schema`. Repeatable.
    #[arg(long = "user-arg", value_parser = parse_key_value)]
    user_args: Vec<(String, String)>,

    /// A `key=value` secret made available to the guest via
    /// `ctx.secret(key)`. Repeatable.
    #[arg(long = "secret", value_parser = parse_key_value)]
    secrets: Vec<(String, String)>,

    /// A `key=value` pre-invocation storage entry. Repeatable.
    #[arg(long = "storage-entry", value_parser = parse_key_value)]
    storage: Vec<(String, String)>,

    /// A `chainId=url` RPC upstream the RPC proxy should route to.
    /// Repeatable.
    #[arg(long = "rpc-provider", value_parser = parse_key_value)]
    rpc_providers: Vec<(String, String)>,

    /// Path to a JSON file containing the event-trigger `log` payload, for
    /// an event-triggered invocation. Omit for a base (non-event) run.
    #[arg(long)]
    log_payload: Option<PathBuf>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliSandboxRuntime {
    Thread,
    Container,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliResultVersion {
    V1,
    V2,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected `key=value`, got {s:?}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    w3f_utils::init_tracing(matches!(cli.log_format, LogFormat::Json));

    let options = build_options(&cli)?;
    let payload = build_payload(&cli)?;

    let supervisor = Arc::new(RunnerSupervisor::new(options));
    let mut run_task = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run(payload).await }
    });

    let report = tokio::select! {
        report = &mut run_task => report.expect("run task should not panic"),
        _ = wait_for_signal() => {
            supervisor.stop();
            (&mut run_task).await.expect("run task should not panic")
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

fn build_options(cli: &Cli) -> anyhow::Result<RunnerOptions> {
    let mut options = match &cli.config {
        Some(path) => RunnerOptions::from_toml_file(path).map_err(anyhow::Error::msg)?,
        None => RunnerOptions::default(),
    };

    if let Some(runtime) = cli.runtime {
        options.runtime = match runtime {
            CliSandboxRuntime::Thread => SandboxRuntime::Thread,
            CliSandboxRuntime::Container => SandboxRuntime::Container,
        };
    }
    if let Some(v) = cli.memory_bytes {
        options.memory = v;
    }
    if let Some(v) = cli.timeout_ms {
        options.timeout = v;
    }
    if let Some(v) = cli.rpc_limit {
        options.rpc_limit = v;
    }
    if let Some(v) = cli.request_limit {
        options.request_limit = v;
    }
    if let Some(v) = cli.download_limit_bytes {
        options.download_limit = v;
    }
    if let Some(v) = cli.upload_limit_bytes {
        options.upload_limit = v;
    }
    if let Some(v) = cli.storage_limit_kb {
        options.storage_limit_kb = v;
    }
    if !cli.blacklist_hosts.is_empty() {
        options.blacklisted_hosts = cli.blacklist_hosts.clone();
    }
    if cli.show_logs {
        options.show_logs = true;
    }

    Ok(options)
}

fn build_payload(cli: &Cli) -> anyhow::Result<RunPayload> {
    let gas_price = GasPrice::parse(cli.gas_price.clone()).map_err(anyhow::Error::msg)?;

    let user_args = match &cli.user_args_schema {
        Some(path) => {
            let schema_raw = std::fs::read_to_string(path)?;
            let schema: UserArgsSchema = serde_json::from_str(&schema_raw)?;
            let raw: HashMap<String, String> = cli.user_args.iter().cloned().collect();
            RunnerSupervisor::parse_user_args(&schema, &raw).map_err(anyhow::Error::msg)?
        }
        None => Default::default(),
    };

    let secrets: HashMap<String, String> = cli.secrets.iter().cloned().collect();
    let storage: HashMap<String, String> = cli.storage.iter().cloned().collect();

    let mut providers = MultiChainProviderConfig::new();
    for (chain_id, url) in &cli.rpc_providers {
        let chain_id: u64 = chain_id
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid chain id in --rpc-provider: {chain_id}"))?;
        providers = providers.with_provider(chain_id, url.clone());
    }

    let log = match &cli.log_payload {
        Some(path) => Some(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => None,
    };

    Ok(RunPayload {
        script: ScriptArtifact::new(cli.script.clone()),
        version: match cli.result_version {
            CliResultVersion::V1 => ResultVersion::V1,
            CliResultVersion::V2 => ResultVersion::V2,
        },
        chain_id: cli.chain_id,
        gas_price,
        task_id: cli.task_id.clone(),
        user_args,
        secrets,
        storage,
        providers,
        log,
    })
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("received SIGINT, stopping run"); }
        _ = terminate => { tracing::info!("received SIGTERM, stopping run"); }
    }
}

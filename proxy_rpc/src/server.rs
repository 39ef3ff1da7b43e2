//! The chain RPC proxy: accepts JSON-RPC requests at
//! `http://127.0.0.1:<port>/`, routes them per chain id to an upstream
//! endpoint, counts calls, and enforces the run's RPC budget.

use crate::error::ProxyRpcError;
use crate::stats::RpcStats;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use w3f_types::{ChainId, MultiChainProviderConfig, RpcCallCounters};

/// Per-run RPC routing and budget configuration.
#[derive(Clone, Debug)]
pub struct RpcProxyConfig {
    pub providers: MultiChainProviderConfig,
    /// Used when a request carries no `chainId` field, or names a chain id
    /// with no configured provider.
    pub default_upstream: Option<String>,
    pub rpc_limit: u64,
}

struct RpcState {
    config: RpcProxyConfig,
    stats: Arc<RpcStats>,
    http_client: reqwest::Client,
}

/// A running RPC proxy instance. Lives for exactly one run.
pub struct RpcProxy {
    stats: Arc<RpcStats>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl RpcProxy {
    pub async fn start(port: u16, config: RpcProxyConfig) -> Result<Self, ProxyRpcError> {
        let stats = Arc::new(RpcStats::default());
        let state = Arc::new(RpcState {
            config,
            stats: stats.clone(),
            http_client: reqwest::Client::new(),
        });

        let app = Router::new().route("/", post(handle_rpc)).with_state(state);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(ProxyRpcError::Bind)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join_handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = result {
                tracing::warn!(error = %err, "RPC proxy server exited with an error");
            }
        });

        tracing::debug!(port, "RPC proxy listening");

        Ok(Self {
            stats,
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        })
    }

    /// Local URL the supervisor rewrites `context.rpcProviderUrl` to.
    pub fn local_url(port: u16) -> String {
        format!("http://127.0.0.1:{port}/")
    }

    pub fn get_nb_rpc_calls(&self) -> RpcCallCounters {
        self.stats.snapshot()
    }

    /// Tear down the proxy. Idempotent and never propagates errors.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "RPC proxy task did not join cleanly");
            }
        }
    }
}

async fn handle_rpc(State(state): State<Arc<RpcState>>, Json(body): Json<Value>) -> Response {
    if state.stats.total() >= state.config.rpc_limit {
        state.stats.record_throttled();
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    let method = body
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    state.stats.record_call(&method);

    let chain_id = body.get("chainId").and_then(Value::as_u64);
    let upstream = match resolve_upstream(&state.config, chain_id) {
        Some(url) => url,
        None => {
            let chain_id = chain_id.unwrap_or_default();
            return (
                StatusCode::BAD_GATEWAY,
                ProxyRpcError::NoUpstream(chain_id).to_string(),
            )
                .into_response();
        }
    };

    match state.http_client.post(&upstream).json(&body).send().await {
        Ok(resp) => {
            let status =
                StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            match resp.bytes().await {
                Ok(bytes) => (status, bytes).into_response(),
                Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
            }
        }
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

fn resolve_upstream(config: &RpcProxyConfig, chain_id: Option<ChainId>) -> Option<String> {
    chain_id
        .and_then(|id| config.providers.upstream_for(id).map(str::to_string))
        .or_else(|| config.default_upstream.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_configured_chain_over_default() {
        let config = RpcProxyConfig {
            providers: MultiChainProviderConfig::new().with_provider(137, "https://polygon.example"),
            default_upstream: Some("https://default.example".to_string()),
            rpc_limit: 10,
        };
        assert_eq!(
            resolve_upstream(&config, Some(137)).as_deref(),
            Some("https://polygon.example")
        );
    }

    #[test]
    fn falls_back_to_default_when_chain_unconfigured() {
        let config = RpcProxyConfig {
            providers: MultiChainProviderConfig::new(),
            default_upstream: Some("https://default.example".to_string()),
            rpc_limit: 10,
        };
        assert_eq!(
            resolve_upstream(&config, Some(1)).as_deref(),
            Some("https://default.example")
        );
    }

    #[test]
    fn no_upstream_when_neither_configured() {
        let config = RpcProxyConfig {
            providers: MultiChainProviderConfig::new(),
            default_upstream: None,
            rpc_limit: 10,
        };
        assert_eq!(resolve_upstream(&config, Some(1)), None);
    }
}

//! RPC facade handed to the guest handler: posts JSON-RPC requests
//! to the RPC proxy and self-exits with code 250 the moment the proxy
//! answers with HTTP 429.

use serde_json::Value;

use crate::error::GuestRuntimeError;

/// The exit code the supervisor recognizes as "RPC proxy throttled the
/// guest".
pub const RPC_THROTTLED_EXIT_CODE: i32 = 250;

pub struct RpcFacade {
    http: reqwest::Client,
    provider_url: String,
    chain_id: u64,
}

impl RpcFacade {
    pub fn new(provider_url: String, chain_id: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider_url,
            chain_id,
        }
    }

    /// Sends a JSON-RPC call through the proxy. On HTTP 429 this exits the
    /// process immediately rather than returning — the supervisor is
    /// watching for exactly this exit code, not a returned error.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, GuestRuntimeError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
            "chainId": self.chain_id,
        });

        let response = self
            .http
            .post(&self.provider_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GuestRuntimeError::Rpc(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            std::process::exit(RPC_THROTTLED_EXIT_CODE);
        }

        if !response.status().is_success() {
            return Err(GuestRuntimeError::Rpc(format!(
                "upstream returned {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GuestRuntimeError::Rpc(e.to_string()))
    }
}

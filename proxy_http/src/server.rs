//! The HTTP egress proxy: forwards the guest's outbound
//! HTTP(S) traffic, metering bytes and request count and enforcing a host
//! blocklist and per-run caps.

use crate::error::ProxyHttpError;
use crate::stats::ProxyStats;
use crate::tunnel;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use w3f_types::NetworkCounters;

/// Per-run configuration the proxy enforces (mirrors the relevant fields of
/// `RunnerOptions`).
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub blacklisted_hosts: Vec<String>,
    pub request_limit: u64,
    pub download_limit: u64,
    pub upload_limit: u64,
    /// Gates the debug `/__proxy/stats` introspection endpoint.
    pub show_logs: bool,
}

struct ProxyState {
    config: ProxyConfig,
    stats: Arc<ProxyStats>,
    http_client: reqwest::Client,
}

/// A running HTTP egress proxy instance. Lives for exactly one run and is
/// always torn down via [`stop`](Self::stop), success or failure.
pub struct HttpEgressProxy {
    stats: Arc<ProxyStats>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl HttpEgressProxy {
    pub async fn start(port: u16, config: ProxyConfig) -> Result<Self, ProxyHttpError> {
        let stats = Arc::new(ProxyStats::default());
        let state = Arc::new(ProxyState {
            config,
            stats: stats.clone(),
            http_client: reqwest::Client::new(),
        });

        let app = Router::new()
            .route("/__proxy/stats", get(stats_handler))
            .fallback(handle_proxy)
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(ProxyHttpError::Bind)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join_handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = result {
                tracing::warn!(error = %err, "HTTP egress proxy server exited with an error");
            }
        });

        tracing::debug!(port, "HTTP egress proxy listening");

        Ok(Self {
            stats,
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        })
    }

    /// Current accounting snapshot; not necessarily final until after
    /// [`stop`](Self::stop) returns.
    pub fn stats(&self) -> NetworkCounters {
        self.stats.snapshot()
    }

    /// Tear down the proxy. Idempotent and never propagates errors — the
    /// supervisor calls this unconditionally from its `stop`.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "HTTP egress proxy task did not join cleanly");
            }
        }
    }
}

async fn stats_handler(State(state): State<Arc<ProxyState>>) -> Response {
    if !state.config.show_logs {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(state.stats.snapshot()).into_response()
}

async fn handle_proxy(State(state): State<Arc<ProxyState>>, req: Request) -> Response {
    if req.method() == Method::CONNECT {
        handle_connect(state, req).await
    } else {
        handle_forward(state, req).await
    }
}

async fn handle_connect(state: Arc<ProxyState>, req: Request) -> Response {
    state.stats.record_request();

    let Some(authority) = req.uri().authority().cloned() else {
        state.stats.record_throttled();
        return (StatusCode::BAD_REQUEST, "CONNECT requires an authority").into_response();
    };

    if is_blacklisted(authority.host(), &state.config.blacklisted_hosts) {
        state.stats.record_throttled();
        return (StatusCode::FORBIDDEN, "host is blocklisted").into_response();
    }
    if state.stats.nb_requests() > state.config.request_limit {
        state.stats.record_throttled();
        return (StatusCode::TOO_MANY_REQUESTS, "request limit reached").into_response();
    }

    let target = authority.to_string();
    let stats = state.stats.clone();
    let upload_cap = state.config.upload_limit;
    let download_cap = state.config.download_limit;

    tokio::spawn(async move {
        match hyper::upgrade::on(req).await {
            Ok(upgraded) => {
                if let Err(err) =
                    tunnel::tunnel(upgraded, &target, stats, upload_cap, download_cap).await
                {
                    tracing::warn!(target = %target, error = %err, "proxy tunnel ended with an error");
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to upgrade CONNECT request"),
        }
    });

    Response::new(Body::empty())
}

async fn handle_forward(state: Arc<ProxyState>, req: Request) -> Response {
    state.stats.record_request();

    let (parts, body) = req.into_parts();
    let host = target_host(&parts.uri, &parts.headers);

    if host
        .as_deref()
        .map(|h| is_blacklisted(h, &state.config.blacklisted_hosts))
        .unwrap_or(false)
    {
        state.stats.record_throttled();
        return (StatusCode::FORBIDDEN, "host is blocklisted").into_response();
    }
    if state.stats.nb_requests() > state.config.request_limit {
        state.stats.record_throttled();
        return (StatusCode::TOO_MANY_REQUESTS, "request limit reached").into_response();
    }

    let Some(target_url) = absolute_url(&parts.uri, host.as_deref()) else {
        return (StatusCode::BAD_REQUEST, "missing target host").into_response();
    };

    let body_bytes = match capped_upload_body(body, &state.stats, state.config.upload_limit).await
    {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let mut builder = state
        .http_client
        .request(parts.method.clone(), &target_url);
    for (name, value) in parts.headers.iter() {
        if name == header::HOST {
            continue;
        }
        builder = builder.header(name, value);
    }
    let upstream = match builder.body(body_bytes).send().await {
        Ok(r) => r,
        Err(err) => return (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response_builder = Response::builder().status(status);
    for (name, value) in upstream.headers().iter() {
        response_builder = response_builder.header(name, value);
    }

    let download_cap = state.config.download_limit;
    let stats = state.stats.clone();
    let counted = capped_download_stream(upstream.bytes_stream(), stats, download_cap);

    response_builder
        .body(Body::from_stream(counted))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Read the request body chunk by chunk, counting each chunk against the
/// upload cap as it arrives, and bail out with a `413` the moment the cap
/// would be exceeded rather than buffering the whole body first.
async fn capped_upload_body(
    body: Body,
    stats: &ProxyStats,
    cap: u64,
) -> Result<Vec<u8>, Response> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()).into_response())?;
        if stats.try_add_upload(chunk.len() as u64, cap) {
            return Err((StatusCode::PAYLOAD_TOO_LARGE, "upload limit reached").into_response());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Wrap an upstream byte stream so that once the cumulative download cap
/// would be exceeded, the stream ends rather than buffering (or
/// forwarding) the rest of the response.
fn capped_download_stream(
    upstream: impl Stream<Item = reqwest::Result<Bytes>> + Send + Unpin + 'static,
    stats: Arc<ProxyStats>,
    cap: u64,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    futures_util::stream::unfold(
        (upstream, stats, false),
        move |(mut upstream, stats, done)| async move {
            if done {
                return None;
            }
            match upstream.next().await {
                Some(Ok(chunk)) => {
                    if stats.try_add_download(chunk.len() as u64, cap) {
                        None
                    } else {
                        Some((Ok(chunk), (upstream, stats, false)))
                    }
                }
                Some(Err(err)) => Some((
                    Err(std::io::Error::other(err.to_string())),
                    (upstream, stats, true),
                )),
                None => None,
            }
        },
    )
}

fn is_blacklisted(host: &str, blacklist: &[String]) -> bool {
    let host = host.trim_start_matches("www.");
    blacklist
        .iter()
        .any(|blocked| host == blocked || host.ends_with(&format!(".{blocked}")))
}

fn target_host(uri: &axum::http::Uri, headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(host) = uri.host() {
        return Some(host.to_string());
    }
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(':').next().unwrap_or(s).to_string())
}

fn absolute_url(uri: &axum::http::Uri, host: Option<&str>) -> Option<String> {
    if uri.scheme().is_some() {
        return Some(uri.to_string());
    }
    let host = host?;
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Some(format!("http://{host}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_matches_exact_host() {
        let list = vec!["evil.example".to_string()];
        assert!(is_blacklisted("evil.example", &list));
        assert!(!is_blacklisted("good.example", &list));
    }

    #[test]
    fn blacklist_matches_subdomains() {
        let list = vec!["evil.example".to_string()];
        assert!(is_blacklisted("api.evil.example", &list));
    }

    #[test]
    fn blacklist_strips_www_prefix() {
        let list = vec!["evil.example".to_string()];
        assert!(is_blacklisted("www.evil.example", &list));
    }

    #[test]
    fn absolute_url_passes_through_full_uri() {
        let uri: axum::http::Uri = "http://example.com/path?x=1".parse().unwrap();
        assert_eq!(
            absolute_url(&uri, None).as_deref(),
            Some("http://example.com/path?x=1")
        );
    }

    #[test]
    fn absolute_url_builds_from_host_header() {
        let uri: axum::http::Uri = "/path".parse().unwrap();
        assert_eq!(
            absolute_url(&uri, Some("example.com")).as_deref(),
            Some("http://example.com/path")
        );
    }

    #[tokio::test]
    async fn capped_upload_body_accepts_under_cap() {
        let stats = ProxyStats::default();
        let body = Body::from(Bytes::from_static(b"hello"));
        let bytes = capped_upload_body(body, &stats, 100).await.unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(stats.upload(), 5);
    }

    /// A multi-chunk body whose cumulative size exceeds the cap partway
    /// through must stop reading at the offending chunk rather than
    /// buffering the whole thing first.
    #[tokio::test]
    async fn capped_upload_body_terminates_mid_stream_over_cap() {
        let stats = ProxyStats::default();
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"0123456789")),
            Ok(Bytes::from_static(b"0123456789")),
        ];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let result = capped_upload_body(body, &stats, 10).await;

        assert!(result.is_err());
        assert_eq!(stats.upload(), 10);
    }
}

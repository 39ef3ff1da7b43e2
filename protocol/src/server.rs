//! The guest side of the protocol: an axum server bound to the supplied
//! port under the supplied mount path, single-shot by construction (the
//! guest process exits after its one reply is drained).

use crate::error::ProtocolError;
use crate::message::{InputEvent, OutputEvent, StartData};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Notify;

pub struct ProtocolServer {
    port: u16,
    mount_path: String,
}

struct ServerState<F> {
    handler: F,
    /// Notified once the single `start` request has been handled, so the
    /// listener can stop accepting connections and let axum's graceful
    /// shutdown drain the in-flight reply before `serve` returns.
    shutdown: Arc<Notify>,
}

impl ProtocolServer {
    pub fn new(port: u16, mount_path: impl Into<String>) -> Self {
        Self {
            port,
            mount_path: mount_path.into(),
        }
    }

    /// Serve exactly one `start` request, invoking `handler` with the
    /// decoded `StartData` and replying with whatever `OutputEvent` it
    /// produces. Returns once that single reply has been handed off to
    /// axum's graceful shutdown, so the caller can schedule its own
    /// process exit immediately afterwards.
    pub async fn serve<F, Fut>(self, handler: F) -> Result<(), ProtocolError>
    where
        F: Fn(StartData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = OutputEvent> + Send + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let state = Arc::new(ServerState {
            handler,
            shutdown: shutdown.clone(),
        });
        let route = format!("/{}", self.mount_path);

        let app = Router::new()
            .route(&route, post(handle_start))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(|e| ProtocolError::Server(e.to_string()))?;

        tracing::debug!(port = self.port, mount_path = %route, "guest protocol server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .map_err(|e| ProtocolError::Server(e.to_string()))
    }
}

async fn handle_start<F, Fut>(
    State(state): State<Arc<ServerState<F>>>,
    Json(body): Json<InputEvent>,
) -> Json<OutputEvent>
where
    F: Fn(StartData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OutputEvent> + Send + 'static,
{
    let InputEvent::Start(start) = body;
    let output = (state.handler)(start).await;
    state.shutdown.notify_one();
    Json(output)
}

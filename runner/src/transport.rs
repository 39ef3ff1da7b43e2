//! The supervisor's view of the protocol seam.
//!
//! Abstracted behind a trait so integration tests can substitute an
//! in-memory fake guest instead of driving a real HTTP round-trip against a
//! subprocess.

use std::time::Duration;

use async_trait::async_trait;
use w3f_protocol::{OutputEvent, ProtocolClient};
use w3f_types::ContextData;

use crate::error::RunnerError;

#[async_trait]
pub trait GuestTransport: Send + Sync {
    /// Blocks until the guest's protocol endpoint is reachable or `budget`
    /// elapses.
    async fn wait_until_ready(&self, budget: Duration) -> Result<(), RunnerError>;

    /// Sends the single `start` message and awaits the guest's reply.
    async fn start(&self, context: ContextData) -> Result<OutputEvent, RunnerError>;
}

/// The production transport: a real HTTP round-trip to the guest's
/// protocol server.
pub struct ProtocolGuestTransport {
    client: ProtocolClient,
}

impl ProtocolGuestTransport {
    pub fn new(host: &str, port: u16, mount_path: &str) -> Self {
        Self {
            client: ProtocolClient::new(host, port, mount_path),
        }
    }
}

#[async_trait]
impl GuestTransport for ProtocolGuestTransport {
    async fn wait_until_ready(&self, budget: Duration) -> Result<(), RunnerError> {
        self.client.wait_until_ready(budget).await.map_err(Into::into)
    }

    async fn start(&self, context: ContextData) -> Result<OutputEvent, RunnerError> {
        self.client.start(context).await.map_err(Into::into)
    }
}

//! The supervisor side of the protocol: connects to the guest's local HTTP
//! endpoint, waits for it to become reachable within a startup budget, and
//! sends the single `start` message.

use crate::error::ProtocolError;
use crate::message::{InputEvent, OutputEvent, StartData};
use std::time::Duration;
use w3f_types::ContextData;

pub struct ProtocolClient {
    http: reqwest::Client,
    url: String,
    port: u16,
}

impl ProtocolClient {
    pub fn new(host: &str, port: u16, mount_path: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("http://{host}:{port}/{mount_path}"),
            port,
        }
    }

    /// Poll a raw TCP connect until the guest's listener accepts, or the
    /// budget elapses.
    pub async fn wait_until_ready(&self, budget: Duration) -> Result<(), ProtocolError> {
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ProtocolError::StartupTimeout);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Send the single `start` message and await the guest's reply.
    pub async fn start(&self, context: ContextData) -> Result<OutputEvent, ProtocolError> {
        let body = InputEvent::Start(StartData { context });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProtocolError::UnexpectedStatus(response.status().as_u16()));
        }

        response
            .json::<OutputEvent>()
            .await
            .map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_url() {
        let client = ProtocolClient::new("127.0.0.1", 4000, "abc123");
        assert_eq!(client.url, "http://127.0.0.1:4000/abc123");
    }
}

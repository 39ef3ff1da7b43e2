//! Port allocator: reserve free local TCP ports for the protocol socket,
//! HTTP proxy, and RPC proxy.
//!
//! Allocation is retry-capable: bind an ephemeral port, immediately drop the
//! listener to free it for the real server, and fall back to another
//! candidate if a later bind in the same batch collides (`AddrInUse`) before
//! the real listener gets a chance to claim it.

use std::net::{SocketAddr, TcpListener};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortAllocationError {
    #[error("failed to bind an ephemeral port after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        last_error: std::io::Error,
    },
}

const MAX_ATTEMPTS: u32 = 16;

/// Reserve a single free local TCP port by binding to port 0 and reading
/// back the OS-assigned port, then releasing the listener.
pub fn allocate_port() -> Result<u16, PortAllocationError> {
    let mut last_error = None;
    for _ in 0..MAX_ATTEMPTS {
        match TcpListener::bind(("127.0.0.1", 0)) {
            Ok(listener) => {
                let port = listener.local_addr().map(|a: SocketAddr| a.port());
                drop(listener);
                if let Ok(port) = port {
                    return Ok(port);
                }
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(PortAllocationError::ExhaustedRetries {
        attempts: MAX_ATTEMPTS,
        last_error: last_error
            .unwrap_or_else(|| std::io::Error::other("no bind attempt succeeded")),
    })
}

/// Reserve `count` distinct free local TCP ports for one run (protocol, HTTP
/// proxy, RPC proxy).
pub fn allocate_ports(count: usize) -> Result<Vec<u16>, PortAllocationError> {
    let mut ports = Vec::with_capacity(count);
    while ports.len() < count {
        let candidate = allocate_port()?;
        if !ports.contains(&candidate) {
            ports.push(candidate);
        }
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_a_bindable_port() {
        let port = allocate_port().expect("should allocate");
        assert!(port > 0);
        // The port should be free again immediately after allocation.
        TcpListener::bind(("127.0.0.1", port)).expect("port should be free");
    }

    #[test]
    fn allocates_distinct_ports_for_a_run() {
        let ports = allocate_ports(3).expect("should allocate three ports");
        assert_eq!(ports.len(), 3);
        assert_ne!(ports[0], ports[1]);
        assert_ne!(ports[1], ports[2]);
        assert_ne!(ports[0], ports[2]);
    }
}

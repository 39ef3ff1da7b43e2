//! HTTP egress proxy: forwards the guest's outbound HTTP(S)
//! traffic, metering bytes in/out and request count, and enforcing a host
//! blocklist and per-run caps.

pub mod error;
pub mod server;
pub mod stats;
pub mod tunnel;

pub use error::ProxyHttpError;
pub use server::{HttpEgressProxy, ProxyConfig};
pub use stats::ProxyStats;

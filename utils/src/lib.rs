//! Shared utilities for the web3 function runtime.

pub mod logging;
pub mod ports;
pub mod time;
pub mod token;

pub use logging::init_tracing;
pub use ports::{allocate_ports, PortAllocationError};
pub use time::format_duration;
pub use token::random_mount_path;

//! Runner supervisor: orchestrates ports, proxies, sandbox, and protocol
//! for exactly one run and assembles the execution report.

pub mod error;
pub mod payload;
pub mod supervisor;
pub mod transport;

pub use error::RunnerError;
pub use payload::RunPayload;
pub use supervisor::RunnerSupervisor;
pub use transport::{GuestTransport, ProtocolGuestTransport};

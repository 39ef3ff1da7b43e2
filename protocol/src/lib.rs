//! Local HTTP protocol between the supervisor and the guest agent: a
//! single `start` request carrying the run's `ContextData`, answered by
//! exactly one `result` or `error` reply carrying the storage delta.

pub mod client;
pub mod error;
pub mod message;
pub mod server;

pub use client::ProtocolClient;
pub use error::ProtocolError;
pub use message::{ErrorData, GuestError, InputEvent, OutputEvent, ResultData, StartData};
pub use server::ProtocolServer;

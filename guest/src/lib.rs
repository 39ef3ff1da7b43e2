//! The guest agent: boots under the sandbox, invokes whichever
//! handler the current invocation calls for, and replies over the local
//! protocol before exiting.
//!
//! A real deployment links this crate into a small binary that builds a
//! [`GuestApp`], registers its compiled-in handler(s), and calls [`run`].

pub mod context;
pub mod error;
pub mod handler;
pub mod rpc;
pub mod runtime;

pub use context::GuestContext;
pub use error::GuestRuntimeError;
pub use handler::{GuestApp, Handler};
pub use rpc::RpcFacade;
pub use runtime::run;

//! Handler registration: a real deployment compiles its handler into the
//! guest binary ahead of time and registers it here; there is no scripting
//! VM in this workspace.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::GuestContext;
use crate::error::GuestRuntimeError;

/// A user-supplied handler. Implemented once per deployment and registered
/// with [`GuestApp`] as the base handler, the event handler, or both.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &mut GuestContext) -> Result<Value, GuestRuntimeError>;
}

/// The registry a guest binary's `main` builds at startup. Exactly one of
/// the base or event handler must exist for a given invocation's shape;
/// absence is a fatal error surfaced at dispatch time rather than at
/// registration time, since a binary may legitimately register only the
/// handler its deployment needs.
#[derive(Clone, Default)]
pub struct GuestApp {
    base: Option<Arc<dyn Handler>>,
    event: Option<Arc<dyn Handler>>,
}

impl GuestApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.base = Some(Arc::new(handler));
        self
    }

    pub fn with_event_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.event = Some(Arc::new(handler));
        self
    }

    /// Picks the handler for this invocation based on whether event context
    /// (`log`) is present.
    pub fn handler_for(&self, is_event: bool) -> Option<Arc<dyn Handler>> {
        if is_event {
            self.event.clone()
        } else {
            self.base.clone()
        }
    }
}

//! A minimal guest binary registering only a base handler. Useful as a
//! manual end-to-end fixture for the thread-runtime sandbox; not used by
//! the in-process supervisor tests, which fake the sandbox/protocol seam.

use async_trait::async_trait;
use serde_json::Value;
use w3f_guest::{GuestApp, GuestContext, GuestRuntimeError, Handler};

struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn call(&self, ctx: &mut GuestContext) -> Result<Value, GuestRuntimeError> {
        ctx.storage_set("lastTaskId", Value::String(ctx.task_id.clone()))?;
        Ok(serde_json::json!({ "canExec": true }))
    }
}

#[tokio::main]
async fn main() {
    w3f_utils::init_tracing(false);
    let app = GuestApp::new().with_base_handler(EchoHandler);
    w3f_guest::run(app).await;
}

//! The guest process's entrypoint: reads its environment, serves
//! exactly one `start` request, and schedules its own exit once the reply
//! has had a chance to drain.

use std::time::Duration;

use w3f_protocol::{ErrorData, GuestError, OutputEvent, ProtocolServer, ResultData, StartData};
use w3f_types::StorageDelta;

use crate::context::GuestContext;
use crate::error::GuestRuntimeError;
use crate::handler::GuestApp;

/// Default port the guest listens on if `WEB3_FUNCTION_SERVER_PORT` is
/// unset.
const DEFAULT_SERVER_PORT: u16 = 80;

/// Grace period after `serve` returns (i.e. after axum's graceful shutdown
/// has drained the single reply) before the process exits, absorbing any
/// last scheduling tick the runtime needs to flush the socket write.
const EXIT_GRACE: Duration = Duration::from_millis(50);

/// Reads `WEB3_FUNCTION_SERVER_PORT`/`WEB3_FUNCTION_MOUNT_PATH`, serves the
/// single `start` request against `app`, and exits the process. Never
/// returns.
pub async fn run(app: GuestApp) -> ! {
    let port = std::env::var("WEB3_FUNCTION_SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_SERVER_PORT);
    let mount_path = std::env::var("WEB3_FUNCTION_MOUNT_PATH").unwrap_or_default();

    let server = ProtocolServer::new(port, mount_path);
    let result = server
        .serve(move |start| {
            let app = app.clone();
            async move { dispatch(&app, start).await }
        })
        .await;

    if let Err(err) = result {
        tracing::error!(error = %err, "guest protocol server exited with an error");
    }

    tokio::time::sleep(EXIT_GRACE).await;
    std::process::exit(0);
}

/// Invokes the handler selected for this invocation and builds the reply
/// event, including the storage diff.
async fn dispatch(app: &GuestApp, start: StartData) -> OutputEvent {
    let mut ctx = GuestContext::from_context_data(start.context);
    let is_event = ctx.is_event();

    let handler = match app.handler_for(is_event) {
        Some(handler) => handler,
        None => {
            return error_event(GuestRuntimeError::HandlerNotRegistered, ctx.pre_storage().clone());
        }
    };

    match handler.call(&mut ctx).await {
        Ok(result) => {
            let diff = StorageDelta::compute(ctx.pre_storage(), ctx.post_storage());
            OutputEvent::Result(ResultData { result, storage: diff })
        }
        Err(err) => error_event(err, ctx.pre_storage().clone()),
    }
}

fn error_event(
    err: GuestRuntimeError,
    pre_storage: std::collections::HashMap<String, String>,
) -> OutputEvent {
    OutputEvent::Error(ErrorData {
        error: GuestError::new(err.name(), err.to_string()),
        storage: StorageDelta {
            state: w3f_types::StorageState::Last,
            storage: pre_storage,
            diff: Default::default(),
        },
    })
}

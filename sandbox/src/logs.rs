//! Shared log-capture buffer for sandbox variants that pipe a child's
//! stdout/stderr back to the supervisor (show-logs option).

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

/// A bounded, append-only log buffer shared between the reader tasks and
/// the sandbox handle.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<String>>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, line: String) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }
}

/// Spawns a background task that reads lines from `reader` and appends them
/// to `buffer`, prefixed so stdout/stderr can be told apart when dumped.
pub fn spawn_line_reader<R>(reader: R, prefix: &'static str, buffer: LogBuffer) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => buffer.push(format!("[{prefix}] {line}")),
                Ok(None) => break,
                Err(err) => {
                    buffer.push(format!("[{prefix}] <log read error: {err}>"));
                    break;
                }
            }
        }
    })
}

//! Handler over a child-process language server.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{frame_reader, frame_writer, Handler, HandlerReader, HandlerWriter};
use crate::error::CoreError;

/// Wraps the stdin/stdout pipes of a spawned language server.
pub struct ProcessHandler {
    reader: Mutex<HandlerReader>,
    writer: Mutex<HandlerWriter>,
    child: Mutex<Option<Child>>,
}

impl ProcessHandler {
    /// Spawn the server command with piped stdio.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, CoreError> {
        debug!(program, ?args, "execute command");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CoreError::Spawn {
                command: program.to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CoreError::Process("failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::Process("failed to get stdout".to_string()))?;

        Ok(Self {
            reader: Mutex::new(frame_reader(stdout)),
            writer: Mutex::new(frame_writer(stdin)),
            child: Mutex::new(Some(child)),
        })
    }
}

#[async_trait]
impl Handler for ProcessHandler {
    async fn reader(&self) -> MutexGuard<'_, HandlerReader> {
        self.reader.lock().await
    }

    async fn writer(&self) -> MutexGuard<'_, HandlerWriter> {
        self.writer.lock().await
    }

    async fn kill(&self) {
        if let Some(child) = self.child.lock().await.as_mut() {
            let _ = child.start_kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let result = ProcessHandler::spawn("lsptap-no-such-binary-12345", &[]);
        assert!(matches!(result, Err(CoreError::Spawn { .. })));
    }
}

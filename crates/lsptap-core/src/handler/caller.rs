//! Handler over the parent process's stdio.
//!
//! Used when lsptap is itself spawned as the language server: the editor
//! that launched it speaks LSP over our stdin/stdout.

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use super::{frame_reader, frame_writer, Handler, HandlerReader, HandlerWriter};

pub struct CallerHandler {
    reader: Mutex<HandlerReader>,
    writer: Mutex<HandlerWriter>,
}

impl CallerHandler {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(frame_reader(tokio::io::stdin())),
            writer: Mutex::new(frame_writer(tokio::io::stdout())),
        }
    }
}

impl Default for CallerHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for CallerHandler {
    async fn reader(&self) -> MutexGuard<'_, HandlerReader> {
        self.reader.lock().await
    }

    async fn writer(&self) -> MutexGuard<'_, HandlerWriter> {
        self.writer.lock().await
    }

    async fn kill(&self) {
        // The parent process governs this stream.
    }
}

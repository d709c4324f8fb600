//! Handler over a TCP connection.

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};

use super::{frame_reader, frame_writer, Handler, HandlerReader, HandlerWriter};

/// Wraps a bidirectional TCP stream.
pub struct SocketHandler {
    reader: Mutex<HandlerReader>,
    writer: Mutex<HandlerWriter>,
}

impl SocketHandler {
    pub fn new(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: Mutex::new(frame_reader(read)),
            writer: Mutex::new(frame_writer(write)),
        }
    }
}

#[async_trait]
impl Handler for SocketHandler {
    async fn reader(&self) -> MutexGuard<'_, HandlerReader> {
        self.reader.lock().await
    }

    async fn writer(&self) -> MutexGuard<'_, HandlerWriter> {
        self.writer.lock().await
    }

    async fn kill(&self) {
        // Shut the write side down; the socket closes fully when the
        // receiver loop exits and drops the handler.
        let _ = self.writer.lock().await.shutdown().await;
    }
}

//! Byte-stream handlers.
//!
//! A handler is the capability set behind one end of a connection: a
//! buffered frame reader, a frame writer, and a way to force the stream
//! closed. The reader is held exclusively by the receiver loop; the writer
//! mutex serializes every sender (self, peer, admin) onto the stream.

mod caller;
mod process;
mod socket;

use async_trait::async_trait;
use lsptap_protocol::{FrameReader, FrameWriter};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::MutexGuard;

pub use caller::CallerHandler;
pub use process::ProcessHandler;
pub use socket::SocketHandler;

/// The read half every handler exposes.
pub type HandlerReader = FrameReader<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// The write half every handler exposes.
pub type HandlerWriter = FrameWriter<Box<dyn AsyncWrite + Send + Unpin>>;

/// One end of an LSP byte stream.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Exclusive access to the buffered read half.
    async fn reader(&self) -> MutexGuard<'_, HandlerReader>;

    /// Exclusive access to the write half.
    async fn writer(&self) -> MutexGuard<'_, HandlerWriter>;

    /// Force the underlying stream toward termination.
    async fn kill(&self);
}

fn frame_reader(read: impl AsyncRead + Send + Unpin + 'static) -> HandlerReader {
    FrameReader::new(BufReader::new(Box::new(read) as Box<dyn AsyncRead + Send + Unpin>))
}

fn frame_writer(write: impl AsyncWrite + Send + Unpin + 'static) -> HandlerWriter {
    FrameWriter::new(Box::new(write) as Box<dyn AsyncWrite + Send + Unpin>)
}

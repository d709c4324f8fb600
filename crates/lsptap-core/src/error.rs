//! Error types for the core crate.

use std::io;

use lsptap_protocol::FrameError;
use thiserror::Error;

/// Errors from receivers, handlers, and listeners.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The reader loop never signalled ready.
    #[error("connection to {0} not made")]
    NotConnected(String),

    /// Lookup of a named receiver failed.
    #[error("no receiver named {0}")]
    UnknownReceiver(String),

    /// A synthetic payload could not be re-serialized.
    #[error("marshal message: {0}")]
    Marshal(#[from] serde_json::Error),

    /// Writing a frame to a handler failed.
    #[error("send content: {0}")]
    Send(#[from] FrameError),

    /// A child-process server could not be spawned.
    #[error("spawn {command}: {source}")]
    Spawn { command: String, source: io::Error },

    /// The child process pipes were unavailable.
    #[error("server process error: {0}")]
    Process(String),

    /// Binding the client-facing port failed.
    #[error("open listener connection: {0}")]
    Listen(#[source] io::Error),

    /// One or more subsystems failed to shut down.
    #[error("shutdown: {0}")]
    Shutdown(String),

    /// Any other I/O failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

//! Connection plumbing for lsptap.
//!
//! A [`Receiver`] owns one [`Handler`] (a socket, a child process, or the
//! parent's stdio), runs the reader loop that pulls frames off it, and
//! either logs what it sees or forwards it to a cross-wired peer. The
//! [`Registry`] names and tracks live receivers, the [`Listener`] accepts
//! editor connections and wires them up, and the [`Terminator`] tears the
//! whole arrangement down in order.

pub mod error;
pub mod handler;
pub mod listener;
pub mod receiver;
pub mod registry;
pub mod terminator;

pub use error::CoreError;
pub use handler::{CallerHandler, Handler, ProcessHandler, SocketHandler};
pub use listener::Listener;
pub use receiver::{cross_wire, Receiver, SERVER_NAME, TESTER_NAME};
pub use registry::Registry;
pub use terminator::{Subsystem, Terminator};

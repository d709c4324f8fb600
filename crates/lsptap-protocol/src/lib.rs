//! Wire-level building blocks for lsptap.
//!
//! This crate knows how LSP traffic looks on the wire and nothing about who
//! is talking:
//!
//! - [`frame`]: the `Content-Length`-prefixed framing codec,
//! - [`envelope`]: JSON-RPC envelope helpers over loosely typed payloads,
//! - [`store`]: canned message files used for synthetic injection.
//!
//! Payload bytes are treated as opaque wherever possible; only the
//! synthetic-send path ([`envelope::decorate_outgoing`]) parses and
//! re-serializes a payload.

pub mod envelope;
pub mod frame;
pub mod store;

pub use envelope::{classify, decorate_outgoing, AnyMap, EnvelopeKind, RequestId};
pub use frame::{FrameError, FrameReader, FrameWriter};
pub use store::{load_message, MessageStore, StoreError};

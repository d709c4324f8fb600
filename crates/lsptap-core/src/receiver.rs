//! The receiver: one connection end, one reader loop.

use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use lsptap_protocol::{decorate_outgoing, AnyMap};
use lsptap_trace::{MessageLog, TraceKind};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::handler::Handler;
use crate::registry::Registry;

/// Logical name of the synthetic endpoint (the admin surface).
pub const TESTER_NAME: &str = "tester";

/// Logical name of the upstream language server connection.
pub const SERVER_NAME: &str = "server";

/// How many one-second waits `start` gives the reader loop to come up.
const START_ATTEMPTS: u32 = 5;

/// Owns one handler and the reader loop that drains it.
///
/// A receiver with no peer logs everything it reads as received by the
/// tester. Cross-wired receivers forward each frame, byte for byte, to
/// their peer's handler.
pub struct Receiver {
    name: String,
    handler: Arc<dyn Handler>,
    trace: Arc<MessageLog>,
    registry: Registry,
    peer: RwLock<Option<Weak<Receiver>>>,
    cancel: CancellationToken,
    log_msg_twice: bool,
}

impl Receiver {
    /// Create a receiver. The name `"client"` is suffixed with a fresh
    /// sequence number; other names are taken as given.
    pub fn new(
        name: &str,
        handler: Arc<dyn Handler>,
        trace: Arc<MessageLog>,
        registry: Registry,
        log_msg_twice: bool,
    ) -> Arc<Self> {
        let name = registry.unique_name(name);
        Arc::new(Self {
            name,
            handler,
            trace,
            registry,
            peer: RwLock::new(None),
            cancel: CancellationToken::new(),
            log_msg_twice,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire this receiver to forward everything it reads to `other`.
    /// May be called before or after `start`; later calls replace the peer.
    pub fn set_peer(&self, other: &Arc<Receiver>) {
        *self.peer.write().unwrap() = Some(Arc::downgrade(other));
    }

    pub fn peer(&self) -> Option<Arc<Receiver>> {
        self.peer.read().unwrap().as_ref().and_then(Weak::upgrade)
    }

    /// Launch the reader loop and wait for it to signal ready.
    pub async fn start(self: Arc<Self>, tasks: &TaskTracker) -> Result<(), CoreError> {
        let (ready_tx, mut ready_rx) = oneshot::channel();
        let name = self.name.clone();
        tasks.spawn(self.run(ready_tx));

        for _ in 0..START_ATTEMPTS {
            match tokio::time::timeout(Duration::from_secs(1), &mut ready_rx).await {
                Ok(Ok(())) => {
                    debug!(name = %name, "connected");
                    return Ok(());
                }
                Ok(Err(_)) => break,
                Err(_) => debug!(name = %name, "connecting..."),
            }
        }
        Err(CoreError::NotConnected(name))
    }

    /// Stamp and send a synthetic message to this receiver's stream.
    ///
    /// The map gains a JSON-RPC version and a fresh request id, and any
    /// relative `params.path` is absolutized, before framing.
    pub async fn send_message(&self, to: &str, mut message: AnyMap) -> Result<(), CoreError> {
        decorate_outgoing(&mut message);
        let content = serde_json::to_vec(&Value::Object(message))?;
        self.send_content(TESTER_NAME, to, &content).await
    }

    /// Log and write raw payload bytes to this receiver's stream.
    pub async fn send_content(&self, from: &str, to: &str, content: &[u8]) -> Result<(), CoreError> {
        self.trace.message(from, to, TraceKind::Send, content);
        self.handler.writer().await.write_frame(content).await?;
        Ok(())
    }

    /// Terminate the handler; the reader loop exits and deregisters.
    pub async fn kill(&self) {
        self.cancel.cancel();
        self.handler.kill().await;
    }

    async fn run(self: Arc<Self>, ready: oneshot::Sender<()>) {
        info!(name = %self.name, "receiver starting");
        self.registry.insert(&self);
        let _ = ready.send(());

        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = async { self.handler.reader().await.read_frame().await } => result,
            };
            match result {
                Ok(content) => self.dispatch(content).await,
                Err(error) if error.is_terminal() => {
                    error!(name = %self.name, "end of file or broken connection");
                    break;
                }
                Err(error) => warn!(name = %self.name, %error, "skipping frame"),
            }
        }

        self.registry.remove(&self.name);
        info!(name = %self.name, "receiver finished");
    }

    async fn dispatch(&self, content: Vec<u8>) {
        match self.peer() {
            None => self
                .trace
                .message(&self.name, TESTER_NAME, TraceKind::Rcvd, &content),
            Some(peer) => {
                let mut from = self.name.as_str();
                if self.log_msg_twice {
                    self.trace
                        .message(&self.name, TESTER_NAME, TraceKind::Rcvd, &content);
                    from = TESTER_NAME;
                }
                if let Err(error) = peer.send_content(from, peer.name(), &content).await {
                    error!(name = %self.name, %error, "sending outgoing message");
                }
            }
        }
    }
}

/// Wire two receivers into a pass-through pair.
pub fn cross_wire(a: &Arc<Receiver>, b: &Arc<Receiver>) {
    a.set_peer(b);
    b.set_peer(a);
}

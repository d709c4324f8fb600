//! Accepting editor connections.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use lsptap_trace::MessageLog;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::error::CoreError;
use crate::handler::SocketHandler;
use crate::receiver::{cross_wire, Receiver, SERVER_NAME};
use crate::registry::Registry;
use crate::terminator::Subsystem;

/// Accepts incoming editor connections and wraps each in a receiver.
///
/// When an upstream `"server"` receiver is registered, every accepted
/// client is cross-wired to it for pass-through operation.
pub struct Listener {
    socket: TcpListener,
    port: u16,
    registry: Registry,
    trace: Arc<MessageLog>,
    tasks: TaskTracker,
    log_msg_twice: bool,
    cancel: CancellationToken,
}

impl Listener {
    /// Bind the client-facing port. The socket is bound when this returns,
    /// so callers can proceed deterministically.
    pub async fn bind(
        port: u16,
        registry: Registry,
        trace: Arc<MessageLog>,
        tasks: TaskTracker,
        log_msg_twice: bool,
    ) -> Result<Arc<Self>, CoreError> {
        let socket = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(CoreError::Listen)?;
        Ok(Arc::new(Self {
            socket,
            port,
            registry,
            trace,
            tasks,
            log_msg_twice,
            cancel: CancellationToken::new(),
        }))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    /// Launch the accept loop on the task tracker.
    pub fn spawn(self: Arc<Self>) {
        let tasks = self.tasks.clone();
        tasks.spawn(self.run());
    }

    async fn run(self: Arc<Self>) {
        info!(port = self.port, "listener starting");
        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = self.socket.accept() => accepted,
            };
            match accepted {
                Ok((stream, addr)) => {
                    info!(%addr, "accepting client");
                    if let Err(error) = self.configure(stream).await {
                        error!(%error, "unable to start receiver");
                    }
                }
                Err(error) => warn!(%error, "listener accept"),
            }
        }
        info!(port = self.port, "listener finished");
    }

    async fn configure(&self, stream: TcpStream) -> Result<(), CoreError> {
        let handler = Arc::new(SocketHandler::new(stream));
        let receiver = Receiver::new(
            "client",
            handler,
            Arc::clone(&self.trace),
            self.registry.clone(),
            self.log_msg_twice,
        );
        if let Some(server) = self.registry.get(SERVER_NAME) {
            info!(client = receiver.name(), "configuring pass-through operation");
            cross_wire(&receiver, &server);
        }
        receiver.start(&self.tasks).await
    }

    /// Stop accepting. In-flight receivers are unaffected.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Subsystem for Listener {
    fn name(&self) -> &str {
        "listener"
    }

    async fn shutdown(&self) -> Result<(), CoreError> {
        self.close();
        Ok(())
    }
}

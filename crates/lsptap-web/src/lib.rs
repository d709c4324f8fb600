//! HTTP admin console.
//!
//! A small web surface over a running tester: inspect the registered
//! receivers, inject canned messages at any of them, switch traffic log
//! formats at runtime, and shut the whole process down. Errors surface as
//! plain text fragments in the rendered page rather than HTTP failures —
//! the console is a debugging tool, not an API.

mod page;
mod routes;
mod state;

use std::sync::Arc;

use async_trait::async_trait;
use lsptap_core::{CoreError, Registry, Subsystem, Terminator};
use lsptap_protocol::MessageStore;
use lsptap_trace::MessageLog;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

pub use routes::create_router;
pub use state::AdminState;

/// The admin HTTP server.
pub struct AdminServer {
    state: AdminState,
    port: u16,
    cancel: CancellationToken,
}

impl AdminServer {
    pub fn new(
        port: u16,
        registry: Registry,
        trace: Arc<MessageLog>,
        store: Arc<MessageStore>,
        terminator: Terminator,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: AdminState::new(registry, trace, store, terminator),
            port,
            cancel: CancellationToken::new(),
        })
    }

    /// Bind the admin port and launch the server on the task tracker.
    pub async fn serve(&self, tasks: &TaskTracker) -> Result<(), CoreError> {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port))
            .await
            .map_err(CoreError::Listen)?;
        info!(
            port = self.port,
            url = %format!("http://localhost:{}", self.port),
            "web server starting"
        );

        let app = create_router(self.state.clone());
        let cancel = self.cancel.clone();
        tasks.spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
            {
                error!(%error, "web service failure");
            }
            info!("web server finished");
        });
        Ok(())
    }
}

#[async_trait]
impl Subsystem for AdminServer {
    fn name(&self) -> &str {
        "web"
    }

    async fn shutdown(&self) -> Result<(), CoreError> {
        self.cancel.cancel();
        Ok(())
    }
}

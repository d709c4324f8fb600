//! Orderly shutdown fan-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::error::CoreError;

/// Anything that participates in shutdown.
#[async_trait]
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &str;

    async fn shutdown(&self) -> Result<(), CoreError>;
}

#[derive(Default)]
struct Inner {
    subsystems: Mutex<Vec<Arc<dyn Subsystem>>>,
    fired: AtomicBool,
}

/// Invokes every registered subsystem's shutdown exactly once,
/// aggregating failures.
#[derive(Clone, Default)]
pub struct Terminator {
    inner: Arc<Inner>,
}

impl Terminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, subsystem: Arc<dyn Subsystem>) {
        self.inner.subsystems.lock().unwrap().push(subsystem);
    }

    /// Shut everything down. Later calls are no-ops.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        if self.inner.fired.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let subsystems: Vec<_> = self.inner.subsystems.lock().unwrap().clone();
        let mut failures = Vec::new();
        for subsystem in subsystems {
            info!(svc = subsystem.name(), "shutdown");
            if let Err(error) = subsystem.shutdown().await {
                failures.push(format!("{}: {error}", subsystem.name()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Shutdown(failures.join("; ")))
        }
    }
}

//! The process-wide receiver registry.
//!
//! Maps logical names to live receivers. A receiver is in the registry
//! exactly while its reader loop runs: the loop inserts itself just before
//! signalling ready and removes itself on exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::error::CoreError;
use crate::receiver::Receiver;
use crate::terminator::Subsystem;

#[derive(Default)]
struct Inner {
    receivers: Mutex<HashMap<String, Arc<Receiver>>>,
    sequence: AtomicU32,
}

/// Shared name → receiver map with unique client naming.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted clients get a fresh `client-K` name; anything else is
    /// taken verbatim.
    pub(crate) fn unique_name(&self, base: &str) -> String {
        if base == "client" {
            format!("client-{}", self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1)
        } else {
            base.to_string()
        }
    }

    pub(crate) fn insert(&self, receiver: &Arc<Receiver>) {
        self.inner
            .receivers
            .lock()
            .unwrap()
            .insert(receiver.name().to_string(), Arc::clone(receiver));
    }

    pub(crate) fn remove(&self, name: &str) {
        self.inner.receivers.lock().unwrap().remove(name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Receiver>> {
        self.inner.receivers.lock().unwrap().get(name).cloned()
    }

    /// Registered names, sorted for stable display.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.receivers.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// A point-in-time copy of every live receiver, safe to iterate while
    /// receivers come and go.
    pub fn snapshot(&self) -> Vec<Arc<Receiver>> {
        self.inner.receivers.lock().unwrap().values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.receivers.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl Subsystem for Registry {
    fn name(&self) -> &str {
        "receivers"
    }

    /// Kill every registered receiver; their loops deregister on exit.
    async fn shutdown(&self) -> Result<(), CoreError> {
        for receiver in self.snapshot() {
            info!(name = receiver.name(), "killing receiver");
            receiver.kill().await;
        }
        Ok(())
    }
}

//! Request/response correlation.
//!
//! Observing a request records its id, method, and params; the matching
//! response looks them up so the keyword renderer can show what a bare
//! `result` was actually answering. Entries expire after a short horizon and
//! a background sweeper reclaims them so the store stays memory-bound. The
//! store is shared across all receivers: request ids are unique in practice
//! and the window is short.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lsptap_protocol::RequestId;
use serde_json::Value;
use tokio::time::Instant;
use tracing::trace;

/// How long a request entry survives.
pub const ID_EXPIRATION: Duration = Duration::from_secs(5);

struct Entry {
    method: String,
    params: Option<Value>,
    expires_at: Instant,
}

struct Inner {
    entries: Mutex<HashMap<RequestId, Entry>>,
    sweeping: AtomicBool,
}

/// Time-expiring map from request id to originating method and params.
#[derive(Clone)]
pub struct CorrelationCache {
    inner: Arc<Inner>,
}

impl Default for CorrelationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                sweeping: AtomicBool::new(false),
            }),
        }
    }

    /// Record a request. Starts the sweeper on first use.
    pub fn record(&self, id: RequestId, method: &str, params: Option<&Value>) {
        {
            let mut entries = self.inner.entries.lock().unwrap();
            entries.insert(
                id,
                Entry {
                    method: method.to_string(),
                    params: params.cloned(),
                    expires_at: Instant::now() + ID_EXPIRATION,
                },
            );
        }
        self.ensure_sweeper();
    }

    /// Look up the originating request for a response id.
    ///
    /// Entries past their expiry are treated as absent even if the sweeper
    /// has not reclaimed them yet.
    pub fn lookup(&self, id: &RequestId) -> Option<(String, Option<Value>)> {
        let entries = self.inner.entries.lock().unwrap();
        let entry = entries.get(id)?;
        if Instant::now() > entry.expires_at {
            return None;
        }
        Some((entry.method.clone(), entry.params.clone()))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    /// Drop entries past their expiry.
    fn sweep(inner: &Inner) {
        let now = Instant::now();
        let mut entries = inner.entries.lock().unwrap();
        entries.retain(|id, entry| {
            let keep = now <= entry.expires_at;
            if !keep {
                trace!(%id, "delete expired correlation entry");
            }
            keep
        });
    }

    /// The sweeper runs for the rest of the process; it never holds up
    /// shutdown and needs no joining. Without a runtime (lookup expiry
    /// still bounds correctness) the next record inside one starts it.
    fn ensure_sweeper(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if self.inner.sweeping.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            loop {
                Self::sweep(&inner);
                tokio::time::sleep(ID_EXPIRATION).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(n: i64) -> RequestId {
        RequestId::from_value(&json!(n)).unwrap()
    }

    #[tokio::test]
    async fn lookup_returns_recorded_request() {
        let cache = CorrelationCache::new();
        let params = json!({"uri": "file:///a"});
        cache.record(id(7), "textDocument/hover", Some(&params));

        let (method, found_params) = cache.lookup(&id(7)).unwrap();
        assert_eq!(method, "textDocument/hover");
        assert_eq!(found_params, Some(params));
        assert!(cache.lookup(&id(8)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_horizon() {
        let cache = CorrelationCache::new();
        cache.record(id(1), "shutdown", None);

        tokio::time::advance(Duration::from_millis(4900)).await;
        assert!(cache.lookup(&id(1)).is_some());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(cache.lookup(&id(1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_reclaims_expired_entries() {
        let cache = CorrelationCache::new();
        cache.record(id(1), "a", None);
        cache.record(id(2), "b", None);
        assert_eq!(cache.len(), 2);

        // Past the expiry horizon plus a sweep period.
        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn ids_of_different_scalar_types_are_distinct() {
        let cache = CorrelationCache::new();
        let int_id = RequestId::from_value(&json!(1)).unwrap();
        let str_id = RequestId::from_value(&json!("1")).unwrap();

        cache.record(int_id.clone(), "by-int", None);
        cache.record(str_id.clone(), "by-str", None);

        assert_eq!(cache.lookup(&int_id).unwrap().0, "by-int");
        assert_eq!(cache.lookup(&str_id).unwrap().0, "by-str");
    }

    #[tokio::test]
    async fn rerecording_overwrites() {
        let cache = CorrelationCache::new();
        cache.record(id(1), "first", None);
        cache.record(id(1), "second", None);
        assert_eq!(cache.lookup(&id(1)).unwrap().0, "second");
    }
}
